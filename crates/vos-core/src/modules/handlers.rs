//! Command bodies for the shipped modules (`date`, `portscan`, `wprint`,
//! `wget`).
//!
//! Handlers fail soft: bad input and network trouble come back as the text
//! the user sees, not as errors.

use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use reqwest::Url;
use vos_terminal::{CommandOutput, Environment};
use vos_types::error::Result;

use super::index::http_client;

/// Timeout for a single-port probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);
/// Per-port timeout during a range scan.
const SCAN_TIMEOUT: Duration = Duration::from_millis(100);
/// Ports covered when `portscan` is given no port.
const SCAN_RANGE: std::ops::RangeInclusive<u16> = 1..=1024;
const HTTP_TIMEOUT_SECS: u64 = 30;

fn text(message: impl Into<String>) -> Result<CommandOutput> {
    Ok(CommandOutput::Text(message.into()))
}

// ---------------------------------------------------------------------------
// date
// ---------------------------------------------------------------------------

/// `date [-t]`
pub fn date(args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
    let now = chrono::Local::now();
    if args.contains(&"-t") {
        text(now.format("%B %d, %Y - %H:%M:%S").to_string())
    } else {
        text(now.format("%B %d, %Y").to_string())
    }
}

// ---------------------------------------------------------------------------
// portscan
// ---------------------------------------------------------------------------

/// `portscan <target> [port]`
pub fn portscan(args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
    let Some(target) = args.first() else {
        return text("No target specified.");
    };
    let host = host_of(target);
    let Some(ip) = resolve(host) else {
        return text("Hostname could not be resolved.");
    };

    match args.get(1) {
        Some(raw) => {
            let port = match raw.parse::<u16>() {
                Ok(port) if port != 0 => port,
                _ => return text(format!("Error: invalid port \"{raw}\".")),
            };
            log::info!("probing {ip}:{port} ({host})");
            if probe(ip, port, PROBE_TIMEOUT) {
                text(format!("Port {port} is open."))
            } else {
                text(format!("Port {port} is closed."))
            }
        },
        None => {
            log::info!(
                "scanning {ip} ({host}) ports {}-{}",
                SCAN_RANGE.start(),
                SCAN_RANGE.end()
            );
            let mut lines = vec![format!(
                "Scanning target {ip} ({host}), ports {}-{}",
                SCAN_RANGE.start(),
                SCAN_RANGE.end()
            )];
            let open: Vec<u16> = SCAN_RANGE.filter(|p| probe(ip, *p, SCAN_TIMEOUT)).collect();
            if open.is_empty() {
                lines.push("No open ports found.".to_string());
            }
            lines.extend(open.iter().map(|p| format!("Port {p} is open.")));
            text(lines.join("\n"))
        },
    }
}

/// Host part of a target that may be written as a URL.
fn host_of(target: &str) -> &str {
    let rest = target.split_once("://").map_or(target, |(_, rest)| rest);
    let authority = rest.split('/').next().unwrap_or(rest);
    match authority.rsplit_once(':') {
        Some((host, port))
            if !host.contains(':') && port.chars().all(|c| c.is_ascii_digit()) =>
        {
            host
        },
        _ => authority,
    }
}

/// First IPv4 address of `host`, else the first address of any family.
fn resolve(host: &str) -> Option<IpAddr> {
    if host.is_empty() {
        return None;
    }
    let addrs: Vec<SocketAddr> = (host, 0).to_socket_addrs().ok()?.collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .map(SocketAddr::ip)
}

fn probe(ip: IpAddr, port: u16, timeout: Duration) -> bool {
    TcpStream::connect_timeout(&SocketAddr::new(ip, port), timeout).is_ok()
}

// ---------------------------------------------------------------------------
// wprint / wget
// ---------------------------------------------------------------------------

/// `wprint <url>`
pub fn wprint(args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
    let Some(raw) = args.first() else {
        return text("Please specify a url to print from.");
    };
    let Some(url) = parse_url(raw) else {
        return text("Invalid url.");
    };
    match fetch(url) {
        Ok(body) => text(String::from_utf8_lossy(&body).into_owned()),
        Err(message) => text(message),
    }
}

/// `wget <url> <file>`
pub fn wget(args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
    let Some(raw) = args.first() else {
        return text("Please specify a url to download from.");
    };
    let Some(file) = args.get(1) else {
        return text("Please specify a file to download to.");
    };
    let Some(url) = parse_url(raw) else {
        return text("Invalid url.");
    };

    let prompter = env.prompter;
    let fs = env.fs()?;
    if fs.exists(file) && !prompter.confirm("File already exists. Overwrite? [Y/n] ") {
        return text("Download cancelled.");
    }

    let body = match fetch(url) {
        Ok(body) => body,
        Err(message) => return text(message),
    };
    match fs.write_file(file, &body) {
        Ok(saved) => text(format!("File successfully saved as {saved}.")),
        Err(e) => text(format!("Error: {e}.")),
    }
}

/// Accept only absolute http(s) URLs.
fn parse_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// GET a URL, mapping failures to the message shown to the user.
fn fetch(url: Url) -> std::result::Result<Vec<u8>, String> {
    let client = http_client(HTTP_TIMEOUT_SECS).map_err(|e| format!("Error: {e}."))?;
    let resp = client.get(url).send().map_err(|e| describe_http_error(&e))?;
    let body = resp.bytes().map_err(|e| describe_http_error(&e))?;
    Ok(body.to_vec())
}

fn describe_http_error(e: &reqwest::Error) -> String {
    if e.is_redirect() {
        "Too many redirects.".to_string()
    } else if e.is_builder() {
        "Invalid url.".to_string()
    } else if e.is_connect() || e.is_timeout() {
        "Connection error.".to_string()
    } else {
        format!("Error: {e}.")
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;
    use crate::modules::catalog::{HandlerCatalog, ModuleCommand};
    use crate::modules::manifest::ModuleManifest;
    use vos_terminal::{CommandRegistry, Origin, Resources, lex, split_sudo};
    use vos_types::config::OsInfo;
    use vos_types::prompt::FixedAnswer;
    use vos_vfs::SandboxFs;

    const MANIFEST: &str = r#"
name = "test_module"
version = "1"
author = "tests"

[commands.date]
keyword = "date"
function = "date"

[commands.portscan]
keyword = "portscan"
function = "portscan"

[commands.wprint]
keyword = "wprint"
function = "wprint"

[commands.wget]
keyword = "wget"
needs_fs = true
function = "wget"
"#;

    struct Harness {
        dir: tempfile::TempDir,
        fs: SandboxFs,
        reg: CommandRegistry,
        answer: FixedAnswer,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let fs = SandboxFs::open(dir.path()).unwrap();
            let manifest = ModuleManifest::from_toml(MANIFEST, &HandlerCatalog::builtin()).unwrap();
            let mut reg = CommandRegistry::new();
            for cmd in manifest.commands {
                reg.register(
                    Box::new(ModuleCommand::new(cmd)),
                    Origin::Module("test_module".into()),
                )
                .unwrap();
            }
            Self {
                dir,
                fs,
                reg,
                answer: FixedAnswer(true),
            }
        }

        fn run(&mut self, line: &str) -> String {
            let (tokens, elevated) = split_sudo(lex(line).tokens);
            let os = OsInfo::default();
            let mut res = Resources {
                fs: &mut self.fs,
                prompter: &self.answer,
                os: &os,
                modules: None,
            };
            self.reg
                .dispatch(&tokens, elevated, &mut res)
                .output
                .text()
                .to_string()
        }
    }

    #[test]
    fn date_formats() {
        let mut h = Harness::new();
        let day = h.run("date");
        assert!(day.contains(", "), "{day}");
        assert!(!day.contains(':'));
        let full = h.run("date -t");
        assert!(full.starts_with(&day), "{full}");
        assert!(full.contains(" - "));
        assert_eq!(full.matches(':').count(), 2);
    }

    #[test]
    fn host_of_strips_scheme_path_and_port() {
        assert_eq!(host_of("example.com"), "example.com");
        assert_eq!(host_of("https://example.com/a/b"), "example.com");
        assert_eq!(host_of("http://example.com:8080/"), "example.com");
        assert_eq!(host_of("localhost:22"), "localhost");
        assert_eq!(host_of("::1"), "::1");
    }

    #[test]
    fn portscan_requires_target() {
        let mut h = Harness::new();
        assert_eq!(h.run("portscan"), "No target specified.");
    }

    #[test]
    fn portscan_unresolvable_host() {
        let mut h = Harness::new();
        assert_eq!(
            h.run("portscan host.invalid 80"),
            "Hostname could not be resolved."
        );
    }

    #[test]
    fn portscan_open_and_closed_port() {
        let mut h = Harness::new();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let open = listener.local_addr().unwrap().port();
        assert_eq!(
            h.run(&format!("portscan 127.0.0.1 {open}")),
            format!("Port {open} is open.")
        );

        let closed = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        assert_eq!(
            h.run(&format!("portscan 127.0.0.1 {closed}")),
            format!("Port {closed} is closed.")
        );
    }

    #[test]
    fn portscan_rejects_bad_port() {
        let mut h = Harness::new();
        assert_eq!(
            h.run("portscan 127.0.0.1 http"),
            "Error: invalid port \"http\"."
        );
    }

    #[test]
    fn wprint_argument_checks() {
        let mut h = Harness::new();
        assert_eq!(h.run("wprint"), "Please specify a url to print from.");
        assert_eq!(h.run("wprint not-a-url"), "Invalid url.");
        assert_eq!(h.run("wprint ftp://example.com/x"), "Invalid url.");
    }

    #[test]
    fn wget_argument_checks() {
        let mut h = Harness::new();
        assert_eq!(h.run("wget"), "Please specify a url to download from.");
        assert_eq!(
            h.run("wget http://example.com"),
            "Please specify a file to download to."
        );
        assert_eq!(h.run("wget nope out.txt"), "Invalid url.");
    }

    #[test]
    fn wget_declined_overwrite_keeps_file() {
        let mut h = Harness::new();
        std::fs::write(h.dir.path().join("page.html"), "old").unwrap();
        h.answer = FixedAnswer(false);
        assert_eq!(
            h.run("wget http://127.0.0.1:9/ page.html"),
            "Download cancelled."
        );
        let kept = std::fs::read_to_string(h.dir.path().join("page.html")).unwrap();
        assert_eq!(kept, "old");
    }
}
