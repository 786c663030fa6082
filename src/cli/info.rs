use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;

use super::command::{Cli, InfoArgs};
use crate::input::InputReader;
use crate::timestamp::time_str;
use ogv::process::session::Session;
use ogv::structs::theora::decoder::FrameKind;
use ogv::structs::theora::info::Info;

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    let input = InputReader::new(&args.input)?;
    if input.is_pipe() {
        log::info!("Analyzing Ogg stream from stdin");
    } else {
        log::info!("Analyzing Ogg stream: {}", args.input.display());
    }

    let mut session = Session::from_reader(input, &cli.open_options())?;

    let mut report = StreamReport::new(&session);
    if !args.yaml {
        display_stream_info(&report);
    }

    report.packets = Some(count_packets(&mut session, multi)?);

    if args.yaml {
        print!("{}", serde_yaml_ng::to_string(&report)?);
    } else if let Some(packets) = &report.packets {
        display_packet_summary(packets);
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct StreamReport {
    serial: String,
    version: String,
    frame: Dimensions,
    picture: PictureRegion,
    frame_rate: Fraction,
    aspect_ratio: Fraction,
    colorspace: String,
    pixel_format: String,
    nominal_bitrate: u32,
    quality: u8,
    keyframe_granule_shift: u8,
    vendor: String,
    comments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    packets: Option<PacketSummary>,
}

#[derive(Debug, Serialize)]
struct Dimensions {
    width: u32,
    height: u32,
}

#[derive(Debug, Serialize)]
struct PictureRegion {
    width: u32,
    height: u32,
    x: u32,
    y: u32,
}

#[derive(Debug, Serialize)]
struct Fraction {
    numerator: u32,
    denominator: u32,
}

#[derive(Debug, Default, Serialize)]
struct PacketSummary {
    total: usize,
    intra: usize,
    inter: usize,
    duplicate: usize,
    bytes: u64,
    last_frame: i64,
    duration: String,
    duration_secs: f64,
}

impl StreamReport {
    fn new<R>(session: &Session<R>) -> Self
    where
        R: std::io::Read,
    {
        let info: &Info = session.info();
        let comment = session.comment();

        Self {
            serial: format!("{:#010X}", session.target_serial()),
            version: format!(
                "{}.{}.{}",
                info.version_major, info.version_minor, info.version_revision
            ),
            frame: Dimensions {
                width: info.frame_width,
                height: info.frame_height,
            },
            picture: PictureRegion {
                width: info.pic_width,
                height: info.pic_height,
                x: info.pic_x,
                y: info.pic_y,
            },
            frame_rate: Fraction {
                numerator: info.fps_numerator,
                denominator: info.fps_denominator,
            },
            aspect_ratio: Fraction {
                numerator: info.aspect_numerator,
                denominator: info.aspect_denominator,
            },
            colorspace: info.colorspace.to_string(),
            pixel_format: info.pixel_format.to_string(),
            nominal_bitrate: info.target_bitrate,
            quality: info.quality,
            keyframe_granule_shift: info.keyframe_granule_shift,
            vendor: comment.vendor.clone(),
            comments: comment.user_comments.clone(),
            packets: None,
        }
    }
}

fn count_packets<R: std::io::Read>(
    session: &mut Session<R>,
    multi: Option<&MultiProgress>,
) -> Result<PacketSummary> {
    let pb = match multi {
        Some(multi) => {
            let pb = multi.add(ProgressBar::new_spinner());
            pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb.set_message("Counting packets...");
            Some(pb)
        }
        None => None,
    };

    let mut summary = PacketSummary {
        last_frame: -1,
        ..Default::default()
    };
    let mut last_granule = -1i64;

    while let Some(packet) = session.next_packet()? {
        match session.decoder().frame_kind(&packet) {
            Some(FrameKind::Intra) => summary.intra += 1,
            Some(FrameKind::Inter) => summary.inter += 1,
            Some(FrameKind::Duplicate) => summary.duplicate += 1,
            None => log::warn!("Header packet {} after setup", packet.packet_number),
        }

        summary.total += 1;
        summary.bytes += packet.data.len() as u64;
        if packet.granule_position >= 0 {
            last_granule = packet.granule_position;
        }

        if summary.total.is_multiple_of(100) {
            if let Some(ref pb) = pb {
                pb.set_message(format!("Counting packets...       {}", summary.total));
                pb.tick();
            }
        }
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let decoder = session.decoder();
    summary.last_frame = decoder.granule_frame(last_granule);
    summary.duration_secs = decoder.granule_time(last_granule);
    summary.duration = time_str(summary.duration_secs);

    log::debug!(
        "Read {} pages, {} bytes ({} skipped)",
        session.pages_read(),
        session.bytes_read(),
        session.bytes_skipped()
    );

    Ok(summary)
}

fn display_stream_info(report: &StreamReport) {
    println!();
    println!("Theora Stream Information");
    println!("=========================");
    println!();
    println!("Stream");
    println!("  Serial number             {}", report.serial);
    println!("  Theora version            {}", report.version);
    println!(
        "  Frame size                {}x{}",
        report.frame.width, report.frame.height
    );
    println!(
        "  Picture region            {}x{} at ({}, {})",
        report.picture.width, report.picture.height, report.picture.x, report.picture.y
    );

    let fps = &report.frame_rate;
    println!(
        "  Frame rate                {:.3} fps ({}/{})",
        fps.numerator as f64 / fps.denominator as f64,
        fps.numerator,
        fps.denominator
    );

    let aspect = &report.aspect_ratio;
    if aspect.numerator == 0 || aspect.denominator == 0 {
        println!("  Pixel aspect ratio        unspecified");
    } else {
        println!(
            "  Pixel aspect ratio        {}:{}",
            aspect.numerator, aspect.denominator
        );
    }

    println!("  Color space               {}", report.colorspace);
    println!("  Pixel format              {}", report.pixel_format);
    if report.nominal_bitrate > 0 {
        println!("  Nominal bitrate           {} bps", report.nominal_bitrate);
    }
    println!("  Quality                   {}", report.quality);
    println!("  Keyframe granule shift    {}", report.keyframe_granule_shift);
    println!();

    println!("Comments");
    println!("  Vendor                    {}", report.vendor);
    for comment in &report.comments {
        println!("  {comment}");
    }
    println!();
}

fn display_packet_summary(summary: &PacketSummary) {
    println!("Analysis Summary");
    println!("  Packets                   {}", summary.total);
    println!(
        "  Frame types               {} intra, {} inter, {} duplicate",
        summary.intra, summary.inter, summary.duplicate
    );

    let size_mb = summary.bytes as f64 / 1_000_000.0;
    println!(
        "  Size                      {size_mb:.2} MB ({} bytes)",
        summary.bytes
    );
    println!("  Duration                  {}", summary.duration);

    if summary.duration_secs > 0.0 {
        let avg_data_rate_kbps = (summary.bytes as f64 * 8.0) / (summary.duration_secs * 1000.0);
        println!("  Average data rate         {avg_data_rate_kbps:.1} kbps");
    }

    println!();
}
