use anyhow::Result;

use super::command::{Cli, PacketsArgs};
use crate::input::InputReader;
use crate::timestamp::time_str;
use ogv::process::session::Session;

pub fn cmd_packets(args: &PacketsArgs, cli: &Cli) -> Result<()> {
    let input = InputReader::new(&args.input)?;
    let mut session = Session::from_reader(input, &cli.open_options())?;

    log::info!(
        "Listing packets of Theora stream {:#010X}",
        session.target_serial()
    );

    println!(
        "{:>8}  {:>14}  {:>8}  {:>13}  {:>9}  {:>8}",
        "packet", "granule", "frame", "time", "kind", "bytes"
    );

    let limit = args.limit.unwrap_or(usize::MAX);
    let mut listed = 0;

    while listed < limit {
        let Some(packet) = session.next_packet()? else {
            break;
        };

        let decoder = session.decoder();
        let kind = decoder
            .frame_kind(&packet)
            .map_or_else(|| "header".to_string(), |kind| kind.to_string());

        // Only the last packet completed on a page carries a granule position.
        let (frame, time) = if packet.granule_position >= 0 {
            (
                decoder.granule_frame(packet.granule_position).to_string(),
                time_str(decoder.granule_time(packet.granule_position)),
            )
        } else {
            ("-".to_string(), "-".to_string())
        };

        println!(
            "{:>8}  {:>14}  {:>8}  {:>13}  {:>9}  {:>8}",
            packet.packet_number,
            packet.granule_position,
            frame,
            time,
            kind,
            packet.data.len()
        );

        listed += 1;
    }

    log::info!("{listed} packets listed");

    Ok(())
}
