//! Console output utilities.

use console::style;

use crate::media::MediaManifest;

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("OK").green().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = r#"
╔═══════════════════════════════════════════════════════╗
║     media-relay                                       ║
║     Share links in, hosted media out                  ║
╚═══════════════════════════════════════════════════════╝
"#;
    println!("{}", style(banner).cyan());
}

/// Print what a resolved manifest is about to transfer.
pub fn print_manifest_summary(manifest: &MediaManifest) {
    let live_photos = manifest
        .images
        .iter()
        .filter(|image| image.live_photo_url.is_some())
        .count();

    println!();
    println!("{}", style("Manifest:").bold());
    println!("  Author: {} ({})", manifest.author.name, manifest.author.uid);
    if !manifest.title.is_empty() {
        println!("  Title:  {}", manifest.title);
    }
    println!("  Images: {}", manifest.images.len());
    println!("  Live:   {}", live_photos);
    println!(
        "  Video:  {}",
        manifest.video_url.as_deref().unwrap_or("none")
    );
    println!();
}
