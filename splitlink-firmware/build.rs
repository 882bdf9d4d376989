//! Build script for splitlink-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates split.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Speeds the link peripheral is configured for
const SPEEDS: [i64; 6] = [460_800, 230_400, 115_200, 57_600, 38_400, 19_200];

/// Recognized keys per section
const LINK_KEYS: [&str; 5] = [
    "speed",
    "duplex",
    "timeout_ms",
    "connection_check_timeout_ms",
    "idle_timeout_ms",
];
const ROLE_KEYS: [&str; 1] = ["initiator_level"];

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    // Linker scripts from cortex-m-rt, embassy-rp and defmt
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate split.toml configuration at compile time
fn validate_config() {
    // Re-run if split.toml changes
    println!("cargo:rerun-if-changed=split.toml");

    let config_path = Path::new("split.toml");

    // Check if config file exists
    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: split.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a split.toml configuration file.          ║\n\
            ║  Please create one in the splitlink-firmware directory.          ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    // Read the config file
    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read split.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    // Parse and validate TOML syntax
    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in split.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_link(&config, &mut errors);
    validate_role(&config, &mut errors);
    report("Invalid link configuration", &errors);

    println!("cargo:warning=split.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fail the build with every collected error
fn report(title: &str, errors: &[String]) {
    if errors.is_empty() {
        return;
    }

    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Only [link] and [role] are understood by the firmware parser
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(table) = config.as_table() else {
        return;
    };

    for (name, value) in table {
        let known: &[&str] = match name.as_str() {
            "link" => &LINK_KEYS,
            "role" => &ROLE_KEYS,
            _ => {
                errors.push(format!("Unknown section [{}]", name));
                continue;
            }
        };

        match value.as_table() {
            Some(section) => {
                for key in section.keys() {
                    if !known.contains(&key.as_str()) {
                        errors.push(format!("[{}] unknown key '{}'", name, key));
                    }
                }
            }
            None => errors.push(format!("'{}' must be a section", name)),
        }
    }
}

/// Validate the [link] section
fn validate_link(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(link) = config.get("link").and_then(|l| l.as_table()) else {
        return;
    };

    match link.get("speed") {
        Some(toml::Value::Integer(speed)) if !SPEEDS.contains(speed) => {
            errors.push(format!("[link] speed {} is not supported", speed));
        }
        Some(toml::Value::Integer(_)) | None => {}
        Some(_) => errors.push("[link] speed must be an integer".to_string()),
    }

    match link.get("duplex") {
        Some(toml::Value::String(duplex)) if duplex == "half" => {
            errors.push("[link] duplex 'half' needs an open-drain TX pad".to_string());
        }
        Some(toml::Value::String(duplex)) if duplex != "full" => {
            errors.push("[link] duplex must be 'full'".to_string());
        }
        Some(toml::Value::String(_)) | None => {}
        Some(_) => errors.push("[link] duplex must be a string".to_string()),
    }

    for (key, min) in [
        ("timeout_ms", 1),
        ("connection_check_timeout_ms", 0),
        ("idle_timeout_ms", 1),
    ] {
        match link.get(key) {
            Some(toml::Value::Integer(ms)) if *ms < min || *ms > i64::from(u32::MAX) => {
                errors.push(format!("[link] {} must be {}-{}", key, min, u32::MAX));
            }
            Some(toml::Value::Integer(_)) | None => {}
            Some(_) => errors.push(format!("[link] {} must be an integer", key)),
        }
    }
}

/// Validate the [role] section
fn validate_role(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(role) = config.get("role").and_then(|r| r.as_table()) else {
        return;
    };

    match role.get("initiator_level") {
        Some(toml::Value::Boolean(_)) | None => {}
        Some(toml::Value::String(level)) if ["high", "low"].contains(&level.as_str()) => {}
        Some(_) => {
            errors.push("[role] initiator_level must be true/false or 'high'/'low'".to_string())
        }
    }
}
