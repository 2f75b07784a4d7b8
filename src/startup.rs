// Startup module - banner and connection summary
//
// Headless mode prints a short banner before the first prompt. In TUI mode
// the same facts go to the log strip instead, since the alternate screen
// hides anything printed beforehand.

use crate::config::{Config, VERSION};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const MAGENTA: &str = "\x1b[35m";
}

/// One line of the startup summary
pub struct StartupLine {
    pub name: &'static str,
    pub ok: bool,
    pub detail: String,
}

fn summary(config: &Config, signed_in: bool) -> Vec<StartupLine> {
    let (transport_ok, endpoint) = match config.transport() {
        Ok(transport) => (true, transport.ws_base().to_string()),
        Err(e) => (false, e.to_string()),
    };

    vec![
        StartupLine {
            name: "backend",
            ok: transport_ok,
            detail: config.backend_url.clone(),
        },
        StartupLine {
            name: "socket",
            ok: transport_ok,
            detail: endpoint,
        },
        StartupLine {
            name: "storage",
            ok: config.data_dir.is_dir(),
            detail: config.data_dir.display().to_string(),
        },
        StartupLine {
            name: "account",
            ok: signed_in,
            detail: if signed_in {
                "signed in".to_string()
            } else {
                "signed out".to_string()
            },
        },
    ]
}

/// Print the startup banner (headless mode)
pub fn print_startup(config: &Config, signed_in: bool) {
    use colors::*;

    println!();
    println!("  {BOLD}{CYAN}shopchat{RESET} {DIM}v{VERSION}{RESET}");
    println!("  {DIM}Shopping assistant in your terminal{RESET}");
    println!();

    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("  {DIM}Config:{RESET} {GREEN}✓{RESET} {}", path.display());
        } else {
            println!("  {DIM}Config:{RESET} {DIM}(using defaults){RESET}");
        }
    }
    println!();

    for line in summary(config, signed_in) {
        let icon = if line.ok {
            format!("{GREEN}✓{RESET}")
        } else {
            format!("{YELLOW}○{RESET}")
        };
        println!(
            "    {icon} {:<10} {DIM}{}{RESET}",
            line.name, line.detail
        );
    }
    println!();
    println!("  {MAGENTA}▸{RESET} Ready");
    println!();
}

/// Write the startup summary to the log strip (TUI mode)
pub fn log_startup(config: &Config, signed_in: bool) {
    tracing::info!("shopchat v{}", VERSION);
    for line in summary(config, signed_in) {
        let icon = if line.ok { "✓" } else { "○" };
        tracing::info!("  {} {} - {}", icon, line.name, line.detail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_flags_unusable_backend() {
        let config = Config {
            backend_url: "not a url".to_string(),
            ..Config::default()
        };
        let lines = summary(&config, false);
        assert!(!lines[0].ok);
        assert!(!lines[1].ok);
        assert_eq!(lines[3].detail, "signed out");
    }

    #[test]
    fn test_summary_derives_socket_base() {
        let config = Config {
            backend_url: "https://shop.example.com".to_string(),
            ..Config::default()
        };
        let lines = summary(&config, true);
        assert!(lines[1].ok);
        assert!(lines[1].detail.starts_with("wss://shop.example.com"));
        assert_eq!(lines[3].detail, "signed in");
    }
}
