use eyre::Result;
use structopt::StructOpt as _;

use podlink::{
    build,
    util,
};

pub use crate::options::{
    Command,
    Options,
};

mod decode;
mod encode;
mod options;
mod trace;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    util::bootstrap!("starting {}", build::describe());

    let Options {
        logging,
        command,
    } = Options::from_args();

    trace::init(&logging);

    tracing::debug!(
        application = build::PACKAGE,
        version = build::VERSION,
        build_commit = build::COMMIT_HASH,
        built_at = build::BUILD_TIMESTAMP,
        "tracing subsystem initialized"
    );

    match command {
        Command::Decode(input) => decode::run(&input).await,

        Command::Basal {
            schedule,
            offset,
            beeps,
            envelope,
        } => encode::basal(&schedule, offset, &beeps, &envelope),

        Command::TempBasal {
            rate,
            duration,
            beeps,
            envelope,
        } => encode::temp_basal(rate, duration, &beeps, &envelope),

        Command::Bolus {
            units,
            extended_units,
            extended_duration,
            beeps,
            envelope,
        } => encode::bolus(units, extended_units, extended_duration, &beeps, &envelope),

        Command::Cancel {
            delivery,
            beep,
            envelope,
        } => encode::cancel(delivery, beep, &envelope),
    }
}
