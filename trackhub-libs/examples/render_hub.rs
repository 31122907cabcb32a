// Example: Load a hub definition and print the files it renders to
use trackhub_libs::{load_hub_config, render};

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "hubs/example/hub.yaml".to_string());

    let config = match load_hub_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Failed to load hub definition: {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Successfully loaded hub definition!");
    println!("  Hub: {}", config.hub.name);
    println!("  Genomes: {}", config.genomes.len());

    let result = config.build().and_then(|(tree, hub)| render(&tree, hub));
    match result {
        Ok(files) => {
            for file in files {
                println!("\n==> {} <==", file.path.display());
                print!("{}", file.contents);
            }
        }
        Err(e) => {
            eprintln!("✗ Failed to render hub: {}", e);
            for violation in e.violations() {
                eprintln!("    - {}", violation);
            }
            std::process::exit(1);
        }
    }
}
