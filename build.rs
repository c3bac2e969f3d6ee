// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: package names
fn packages_arg() -> Arg {
    Arg::new("packages")
        .required(true)
        .num_args(1..)
        .help("Package names (repository or AUR)")
}

/// Common argument: JSON output
fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print the plan as JSON")
}

fn build_cli() -> Command {
    Command::new("aurweave")
        .version(env!("CARGO_PKG_VERSION"))
        .author("aurweave contributors")
        .about("Install packages from the pacman repositories and the AUR")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Configuration file (default: $XDG_CONFIG_HOME/aurweave/config.toml)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Enable debug logging"),
        )
        .subcommand(
            Command::new("install")
                .about("Resolve, audit and install packages")
                .arg(packages_arg())
                .arg(
                    Arg::new("noconfirm")
                        .short('y')
                        .long("noconfirm")
                        .action(ArgAction::SetTrue)
                        .help("Skip audit prompts and pacman/makepkg confirmations"),
                )
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Show what would be installed without making changes"),
                )
                .arg(
                    Arg::new("best_effort")
                        .long("best-effort")
                        .action(ArgAction::SetTrue)
                        .help("Build packages whose AUR dependency was skipped at audit anyway"),
                )
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("plan")
                .about("Show the installation plan without installing anything")
                .arg(packages_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove installed packages and the dependencies nothing else needs")
                .arg(
                    Arg::new("packages")
                        .required(true)
                        .num_args(1..)
                        .help("Installed package names"),
                )
                .arg(
                    Arg::new("noconfirm")
                        .short('y')
                        .long("noconfirm")
                        .action(ArgAction::SetTrue)
                        .help("Skip pacman confirmation"),
                )
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Show the removal command without running it"),
                ),
        )
        .subcommand(
            Command::new("search")
                .about("Search the sync repositories and the AUR")
                .arg(
                    Arg::new("terms")
                        .required(true)
                        .num_args(1..)
                        .help("Search terms (joined with spaces)"),
                )
                .arg(
                    Arg::new("limit")
                        .short('l')
                        .long("limit")
                        .default_value("20")
                        .help("Maximum number of results to show"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell", "elvish"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("aurweave.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
