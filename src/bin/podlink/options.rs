use std::{
    path::PathBuf,
    time::Duration,
};

use podlink::message::block::{
    BeepOptions,
    BeepType,
    CancelDeliveryType,
};

#[derive(Debug, Clone, PartialEq, structopt::StructOpt)]
#[structopt(about = "encode and decode pod radio messages")]
pub struct Options {
    #[structopt(flatten)]
    pub logging: Logging,

    #[structopt(subcommand)]
    pub command: Command,
}

/// Diagnostics go to stderr; stdout carries only command output.
#[derive(Debug, Clone, PartialEq, Eq, structopt::StructOpt)]
pub struct Logging {
    /// Raise podlink's log level (-v debug, -vv trace). Ignored when RUST_LOG is set.
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: u8,

    /// pretty, compact or json.
    #[structopt(long, parse(try_from_str = parse_log_format), default_value = LogFormat::DEFAULT)]
    pub log_format: LogFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    const DEFAULT: &'static str = {
        cfg_if::cfg_if! {
            if #[cfg(debug_assertions)] {
                "pretty"
            } else {
                "json"
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, structopt::StructOpt)]
pub enum Command {
    /// Decode a message (or the radio packets carrying one) from stdin.
    Decode(Input),

    /// Compile a basal schedule into the command pair that programs it.
    Basal {
        /// JSON schedule: `{"entries": [{"start": <secs>, "rate": <U/h>}, ...]}`.
        #[structopt(long)]
        schedule: PathBuf,

        /// Time of day to start the schedule at, in seconds after midnight.
        #[structopt(long, parse(try_from_str = parse_secs))]
        offset: Duration,

        #[structopt(flatten)]
        beeps: Beeps,

        #[structopt(flatten)]
        envelope: Envelope,
    },

    /// Encode a temp basal command pair.
    TempBasal {
        /// U/h.
        #[structopt(long)]
        rate: f64,

        /// Seconds, rounded to whole half hours.
        #[structopt(long, parse(try_from_str = parse_secs))]
        duration: Duration,

        #[structopt(flatten)]
        beeps: Beeps,

        #[structopt(flatten)]
        envelope: Envelope,
    },

    /// Encode a bolus command pair.
    Bolus {
        #[structopt(long)]
        units: f64,

        #[structopt(long, default_value = "0")]
        extended_units: f64,

        /// Seconds.
        #[structopt(long, parse(try_from_str = parse_secs), default_value = "0")]
        extended_duration: Duration,

        #[structopt(flatten)]
        beeps: Beeps,

        #[structopt(flatten)]
        envelope: Envelope,
    },

    /// Encode a cancel delivery command.
    Cancel {
        /// basal, temp-basal, bolus, all-but-basal or all.
        #[structopt(long, parse(try_from_str = parse_delivery_type))]
        delivery: CancelDeliveryType,

        /// Beep pattern name, e.g. `no-beep-cancel` or `beeeeeep`.
        #[structopt(long, parse(try_from_str = parse_beep_type), default_value = "no-beep-cancel")]
        beep: BeepType,

        #[structopt(flatten)]
        envelope: Envelope,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, structopt::StructOpt)]
pub struct Input {
    #[structopt(
        long,
        help = "interpret stdin as hex (can be space and/or newline separated, does not strip 0x)"
    )]
    pub hex: bool,

    #[structopt(long, help = "interpret stdin as base64")]
    pub base64: bool,

    #[structopt(
        long,
        help = "stdin holds radio packets: one per line with --hex/--base64, otherwise a COBS-framed stream"
    )]
    pub packets: bool,
}

/// Addressing for the message that wraps generated blocks.
#[derive(Debug, Clone, PartialEq, Eq, structopt::StructOpt)]
pub struct Envelope {
    #[structopt(long, parse(try_from_str = parse_hex_u32))]
    pub nonce: u32,

    #[structopt(long, parse(try_from_str = parse_hex_u32), default_value = "1f01482a")]
    pub address: u32,

    /// Message sequence number.
    #[structopt(long, default_value = "0")]
    pub seq: u8,

    /// Sequence number of the first radio packet.
    #[structopt(long, default_value = "0")]
    pub packet_seq: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, structopt::StructOpt)]
pub struct Beeps {
    #[structopt(long)]
    pub acknowledgement_beep: bool,

    #[structopt(long)]
    pub completion_beep: bool,

    /// Program reminder interval in minutes.
    #[structopt(long, default_value = "0")]
    pub reminder: u64,
}

impl From<&Beeps> for BeepOptions {
    fn from(beeps: &Beeps) -> Self {
        BeepOptions::new(
            beeps.acknowledgement_beep,
            beeps.completion_beep,
            Duration::from_secs(beeps.reminder * 60),
        )
    }
}

fn parse_secs(s: &str) -> eyre::Result<Duration> {
    Ok(Duration::try_from_secs_f64(s.parse()?)?)
}

fn parse_hex_u32(s: &str) -> eyre::Result<u32> {
    Ok(u32::from_str_radix(s.trim_start_matches("0x"), 16)?)
}

fn parse_log_format(s: &str) -> eyre::Result<LogFormat> {
    let format = match s {
        "pretty" => LogFormat::Pretty,
        "compact" => LogFormat::Compact,
        "json" => LogFormat::Json,
        other => eyre::bail!("unknown log format {other:?}"),
    };

    Ok(format)
}

fn parse_delivery_type(s: &str) -> eyre::Result<CancelDeliveryType> {
    let ty = match s {
        "basal" => CancelDeliveryType::Basal,
        "temp-basal" => CancelDeliveryType::TempBasal,
        "bolus" => CancelDeliveryType::Bolus,
        "all-but-basal" => CancelDeliveryType::AllButBasal,
        "all" => CancelDeliveryType::All,
        other => eyre::bail!("unknown delivery type {other:?}"),
    };

    Ok(ty)
}

const BEEP_TYPES: [BeepType; 10] = [
    BeepType::NoBeepCancel,
    BeepType::BeepBeepBeepBeep,
    BeepType::BipBeepBipBeepBipBeepBipBeep,
    BeepType::BipBip,
    BeepType::Beep,
    BeepType::BeepBeepBeep,
    BeepType::Beeeeeep,
    BeepType::BipBipBipbipBipBip,
    BeepType::BeeepBeeep,
    BeepType::NoBeepNonCancel,
];

/// Match against variant names with dashes and case ignored.
fn parse_beep_type(s: &str) -> eyre::Result<BeepType> {
    let wanted = s.replace('-', "");

    BEEP_TYPES
        .into_iter()
        .find(|ty| format!("{ty:?}").eq_ignore_ascii_case(&wanted))
        .ok_or_else(|| eyre::eyre!("unknown beep type {s:?}"))
}
