use wavetune_core::playback::device::list_output_devices;

fn main() {
    println!("WaveTune Output Devices\n");

    match list_output_devices() {
        Ok(devices) if devices.is_empty() => println!("  (none found)"),
        Ok(devices) => {
            for device in devices {
                let marker = if device.is_default { " (default)" } else { "" };
                println!("  {}{}", device.name, marker);
            }
        }
        Err(e) => {
            eprintln!("Error listing devices: {}", e);
            std::process::exit(1);
        }
    }
}
