use edfslice::{EdfReader, Result};

fn main() -> Result<()> {
    env_logger::init();

    println!("edfslice {}", edfslice::version());

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: inspect <recording.edf>");
            return Ok(());
        }
    };

    let reader = EdfReader::open(&path)?;
    let header = reader.header();

    println!("File type: {:?}", header.file_type);
    println!("Start: {}", header.start);
    println!("Patient: {}", header.patient);
    println!("Recording: {}", header.recording);
    println!(
        "Data records: {} x {}s = {:.2}s",
        reader.record_count(),
        header.record_duration_secs(),
        reader.duration()
    );
    println!("Record length: {} bytes", reader.layout().record_length());

    for (i, signal) in reader.channel_headers().iter().enumerate() {
        let cal = reader.calibration(i)?;
        println!(
            "Signal {}: {} ({}) {} Hz, physical [{}, {}], digital [{}, {}], gain {:.6}, offset {:.6}",
            i,
            signal.label,
            signal.physical_dimension,
            reader.sampling_rate(i)?,
            signal.physical_min,
            signal.physical_max,
            signal.digital_min,
            signal.digital_max,
            cal.gain,
            cal.offset
        );
    }

    for (i, group) in reader.groups().iter().enumerate() {
        println!("Group {}: {} Hz, channels {:?}", i, group.sampling_rate, group.channels);
    }

    reader.close();
    Ok(())
}
