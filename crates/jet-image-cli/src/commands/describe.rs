//! Configuration template command

use anyhow::{Context as _, Result};
use jet_image_core::ProducerConfig;

pub fn print_template() -> Result<()> {
    let template = ProducerConfig::template();
    let yaml = template
        .to_yaml()
        .context("Failed to serialize configuration template")?;

    println!("# Jet image producer configuration");
    println!("# client.mode: sync | async | pseudo_async");
    println!("# client.batch_size: maximum jets per event (0 = unlimited)");
    println!("# client.timeout_secs: 0 disables the inference timeout");
    print!("{}", yaml);
    Ok(())
}
