use std::io::{
    self,
    Read,
};

use base64::Engine;
use eyre::Result;
use futures::StreamExt;

use podlink::{
    codec::{
        tokio_codec::FramedRead,
        MessageAssembler,
        MessageCodec,
    },
    message::{
        block::ErrorResponse,
        Message,
        MessageBlock,
        RadioPacket,
    },
    util::trace_catch,
};

use crate::options::Input;

pub async fn run(input: &Input) -> Result<()> {
    let textual = input.hex || input.base64;

    match (input.packets, textual) {
        (true, false) => decode_stream().await,

        (true, true) => {
            let mut assembler = MessageAssembler::new();

            for line in read_text()?.lines().filter(|line| !line.trim().is_empty()) {
                let packet = RadioPacket::decode(&decode_text(input, line)?)?;
                tracing::debug!(%packet, "read packet");

                if let Some(msg) = assembler.push(packet)? {
                    print_message(&msg);
                }
            }

            if !assembler.is_empty() {
                eyre::bail!("input ended partway through a message");
            }

            Ok(())
        },

        (false, true) => {
            let buf = decode_text(input, &read_text()?)?;
            print_message(&Message::decode(&buf)?);

            Ok(())
        },

        (false, false) => {
            let mut buf = vec![];
            io::stdin().read_to_end(&mut buf)?;
            print_message(&Message::decode(&buf)?);

            Ok(())
        },
    }
}

/// Messages from a COBS-framed packet stream on stdin, printed as they complete.
async fn decode_stream() -> Result<()> {
    let mut messages = FramedRead::new(tokio::io::stdin(), MessageCodec::default());

    while let Some(result) = messages.next().await {
        if let Some(msg) = trace_catch!(result, "decoding packet stream") {
            print_message(&msg);
        }
    }

    Ok(())
}

fn read_text() -> Result<String> {
    let mut s = String::new();
    io::stdin().read_to_string(&mut s)?;

    Ok(s)
}

fn decode_text(input: &Input, s: &str) -> Result<Vec<u8>> {
    let buf = if input.base64 {
        base64::engine::general_purpose::STANDARD.decode(s.trim())?
    } else {
        hex::decode(s.trim().replace(&[' ', '\t', '\n', '\r'][..], ""))?
    };

    Ok(buf)
}

fn print_message(msg: &Message) {
    println!(
        "MESSAGE {:08x} seq:{}{}",
        msg.address,
        msg.sequence,
        if msg.expect_follow_on { " [follow-on]" } else { "" }
    );

    for block in &msg.blocks {
        println!("\t{block:?}");

        if let MessageBlock::ErrorResponse(ErrorResponse::BadNonce {
            resync_key,
        }) = block
        {
            println!("\tbad nonce: resync with key {resync_key:#06x}");
        }
    }
}
