//! Entry point for the infrasentinel dashboard. Parses args, signs in, and runs the App.

use std::env;
use std::io::{self, Write};
use std::path::Path;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::{info, warn};

use infrasentinel::api::{parse_base_url, ApiClient};
use infrasentinel::app::{App, AppExit};
use infrasentinel::error::ClientError;
use infrasentinel::history::{DEFAULT_RANGE, RANGE_PRESETS};
use infrasentinel::logging::init_logging;
use infrasentinel::profiles::{
    load_profiles, save_profiles, ProfileEntry, ProfileRequest, ResolveProfile,
};
use infrasentinel::session::{session_path, SessionStore};
use infrasentinel::tls::load_ca;

const PASSWORD_ENV: &str = "INFRASENTINEL_PASSWORD";

#[derive(Debug, Default)]
struct ParsedArgs {
    url: Option<String>,
    tls_ca: Option<String>,
    profile: Option<String>,
    user: Option<String>,
    range: Option<usize>,
    save: bool,
    logout: bool,
    dry_run: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum ArgsError {
    Help(String),
    Invalid(String),
}

fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--tls-ca CERT_PEM|-t CERT_PEM] [--profile NAME|-P NAME] [--save] \
         [--user NAME|-u NAME] [--range N|-r N] [--logout] [--dry-run] [http(s)://HOST:PORT]"
    )
}

fn parse_range(v: &str) -> Result<usize, String> {
    match v.parse::<usize>() {
        Ok(n) if RANGE_PRESETS.contains(&n) => Ok(n),
        _ => Err(format!(
            "Invalid range '{v}': expected one of {}",
            RANGE_PRESETS.map(|n| n.to_string()).join(", ")
        )),
    }
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, ArgsError> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "infrasentinel".into());
    let mut out = ParsedArgs::default();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(ArgsError::Help(usage(&prog))),
            "--tls-ca" | "-t" => {
                out.tls_ca = it.next();
            }
            "--profile" | "-P" => {
                out.profile = it.next();
            }
            "--user" | "-u" => {
                out.user = it.next();
            }
            "--range" | "-r" => {
                let v = it.next().unwrap_or_default();
                out.range = Some(parse_range(&v).map_err(ArgsError::Invalid)?);
            }
            "--save" => out.save = true,
            "--logout" => out.logout = true,
            "--dry-run" => out.dry_run = true,
            _ if arg.starts_with("--") && arg.contains('=') => {
                let Some((k, v)) = arg.split_once('=') else { continue };
                if v.is_empty() {
                    continue;
                }
                match k {
                    "--tls-ca" => out.tls_ca = Some(v.to_string()),
                    "--profile" => out.profile = Some(v.to_string()),
                    "--user" => out.user = Some(v.to_string()),
                    "--range" => out.range = Some(parse_range(v).map_err(ArgsError::Invalid)?),
                    _ => {
                        return Err(ArgsError::Invalid(format!(
                            "Unknown option {k}. {}",
                            usage(&prog)
                        )))
                    }
                }
            }
            _ => {
                if out.url.is_none() {
                    out.url = Some(arg);
                } else {
                    return Err(ArgsError::Invalid(format!(
                        "Unexpected argument. {}",
                        usage(&prog)
                    )));
                }
            }
        }
    }
    Ok(out)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(ArgsError::Help(msg)) => {
            println!("{msg}");
            return Ok(());
        }
        Err(ArgsError::Invalid(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };
    let _ = rustls::crypto::ring::default_provider().install_default();
    init_logging();

    let session = SessionStore::open(session_path());
    if parsed.logout {
        session.clear();
        eprintln!("Signed out.");
        return Ok(());
    }

    let Some(target) = resolve_target(&parsed)? else {
        return Ok(());
    };
    let base = parse_base_url(&target.url)?;

    if parsed.dry_run {
        println!("Would connect to {base}");
        return Ok(());
    }

    let tls = target
        .tls_ca
        .as_deref()
        .map(|p| load_ca(Path::new(p)))
        .transpose()?;
    let api = ApiClient::new(base, session.clone(), tls.as_ref())?;
    let ws_tls = tls.as_ref().map(|t| t.ws_config.clone());
    let range = parsed.range.unwrap_or(DEFAULT_RANGE);

    loop {
        if !session.is_valid() {
            // Expired or missing; drop whatever is stored before asking again.
            session.clear();
            if !login(&api, &session, target.username.as_deref()).await? {
                return Ok(());
            }
        }
        let mut app = App::new(api.clone(), range, ws_tls.clone());
        match app.run().await? {
            AppExit::Quit => return Ok(()),
            AppExit::LoginRequired => {
                info!("returning to login");
                eprintln!("Session ended. Please sign in again.");
            }
        }
    }
}

/// Picks the backend to talk to, creating or updating profiles as needed.
fn resolve_target(parsed: &ParsedArgs) -> anyhow::Result<Option<ProfileEntry>> {
    let profiles_file = load_profiles();
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        url: parsed.url.clone(),
        tls_ca: parsed.tls_ca.clone(),
        username: parsed.user.clone(),
    };
    let mut profiles_mut = profiles_file.clone();

    let entry = match req.resolve(&profiles_file) {
        ResolveProfile::Direct(entry) => {
            if let Some(name) = parsed.profile.as_ref() {
                match profiles_mut.profiles.get(name) {
                    None => {
                        // New profile: auto-save immediately
                        profiles_mut.profiles.insert(name.clone(), entry.clone());
                        persist(&profiles_mut);
                    }
                    Some(existing) if *existing != entry => {
                        let overwrite = parsed.save
                            || prompt_yes_no(&format!(
                                "Overwrite existing profile '{name}'? [y/N]: "
                            ));
                        if overwrite {
                            profiles_mut.profiles.insert(name.clone(), entry.clone());
                            persist(&profiles_mut);
                        }
                    }
                    Some(_) => {}
                }
            }
            entry
        }
        ResolveProfile::Loaded(entry) => entry,
        ResolveProfile::PromptSelect(names) => {
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            let line = prompt_string("Enter number (or blank to abort): ")?;
            let picked = line
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&i| i >= 1 && i <= names.len())
                .and_then(|i| profiles_mut.profiles.get(&names[i - 1]));
            match picked {
                Some(entry) => {
                    let mut entry = entry.clone();
                    if parsed.user.is_some() {
                        entry.username = parsed.user.clone();
                    }
                    entry
                }
                None => return Ok(None),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter URL (http://HOST:PORT or https://...): ")?;
            if url.trim().is_empty() {
                return Ok(None);
            }
            let ca = prompt_string("Enter TLS CA path (or leave blank): ")?;
            let user = match parsed.user.clone() {
                Some(u) => Some(u),
                None => Some(prompt_string("Username (or leave blank): ")?)
                    .map(|u| u.trim().to_string())
                    .filter(|u| !u.is_empty()),
            };
            let entry = ProfileEntry {
                url: url.trim().to_string(),
                tls_ca: Some(ca.trim().to_string()).filter(|c| !c.is_empty()),
                username: user,
            };
            profiles_mut.profiles.insert(name, entry.clone());
            persist(&profiles_mut);
            entry
        }
        ResolveProfile::None => {
            eprintln!("No URL provided and no profiles to select.");
            return Ok(None);
        }
    };
    Ok(Some(entry))
}

fn persist(pf: &infrasentinel::profiles::ProfilesFile) {
    if let Err(e) = save_profiles(pf) {
        warn!("could not save profiles: {e}");
        eprintln!("Warning: could not save profiles: {e}");
    }
}

/// Prompts until a login succeeds. Returns false if the user gives up.
async fn login(api: &ApiClient, session: &SessionStore, username: Option<&str>) -> anyhow::Result<bool> {
    let env_password = env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty());
    loop {
        let user = match username {
            Some(u) => u.to_string(),
            None => prompt_string("Username: ")?.trim().to_string(),
        };
        if user.is_empty() {
            return Ok(false);
        }
        let password = match env_password.clone() {
            Some(p) => p,
            None => match prompt_password("Password: ")? {
                Some(p) => p,
                None => return Ok(false),
            },
        };

        match api.login(&user, &password).await {
            Ok(token) => {
                session.set_credential(token)?;
                info!("signed in as {user}");
                return Ok(true);
            }
            Err(ClientError::ActionFailure { detail, .. }) => {
                warn!("login rejected for {user}");
                eprintln!("{detail}");
            }
            Err(e) => {
                warn!("login failed: {e}");
                eprintln!("Login failed. Please try again. ({e})");
            }
        }
        // A fixed password would fail the same way forever.
        if env_password.is_some() {
            return Ok(false);
        }
    }
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_ok() {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

/// Reads a line without echo. `None` on Esc or Ctrl-C.
fn prompt_password(prompt: &str) -> io::Result<Option<String>> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    enable_raw_mode()?;
    let res = read_hidden_line();
    let _ = disable_raw_mode();
    eprintln!();
    res
}

fn read_hidden_line() -> io::Result<Option<String>> {
    let mut buf = String::new();
    loop {
        let Event::Key(k) = event::read()? else { continue };
        if k.kind == KeyEventKind::Release {
            continue;
        }
        match k.code {
            KeyCode::Enter => return Ok(Some(buf)),
            KeyCode::Esc => return Ok(None),
            KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => return Ok(None),
            KeyCode::Backspace => {
                buf.pop();
            }
            KeyCode::Char(c) => buf.push(c),
            _ => {}
        }
    }
}
