use std::str::FromStr;

use bytes::BytesMut;
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use podlink::{
    codec::{
        tokio_codec::{
            Encoder,
            FramedRead,
        },
        MessageCodec,
    },
    message::Message,
};

pub fn trace_init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::from_str("debug").expect("parsing envfilter"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}

/// Push `messages` through a COBS-framed packet stream and collect what comes out the far side.
pub async fn over_the_wire(messages: &[Message]) -> eyre::Result<Vec<Message>> {
    let mut codec = MessageCodec::new(0);
    let mut wire = BytesMut::new();

    for msg in messages {
        codec.encode(msg, &mut wire)?;
    }

    let received = FramedRead::new(&wire[..], MessageCodec::default())
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(received)
}
