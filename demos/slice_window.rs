use edfslice::{EdfReader, ReaderOptions, Result, SignalGroupMode};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: slice_window <recording.edf> <t_start> <t_stop> [split]");
        return Ok(());
    }

    let parse = |s: &str| s.parse::<f64>().ok();
    let (t_start, t_stop) = (parse(&args[2]), parse(&args[3]));

    let mode = if args.get(4).map(String::as_str) == Some("split") {
        SignalGroupMode::SplitAll
    } else {
        SignalGroupMode::GroupByRate
    };
    let options = ReaderOptions::new().group_mode(mode).require_non_empty(true);

    let mut reader = EdfReader::open_with_options(&args[1], options)?;
    let channels = reader.all_channels();
    let blocks = reader.read_slice_grouped(&channels, t_start, t_stop)?;

    for block in &blocks {
        println!(
            "{} Hz from {:.3}s: {} samples x {} channels",
            block.sampling_rate,
            block.t_start,
            block.len(),
            block.channels.len()
        );

        for (channel, column) in block.channels.iter().zip(&block.data) {
            let signal = &reader.channel_headers()[*channel];
            let mean = column.iter().sum::<f64>() / column.len().max(1) as f64;
            let max = column.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            let min = column.iter().fold(f64::INFINITY, |a, &b| a.min(b));
            println!(
                "  {}: mean {:.2} {}, range {:.2} to {:.2}",
                signal.label, mean, signal.physical_dimension, min, max
            );
        }
    }

    reader.close();
    Ok(())
}
