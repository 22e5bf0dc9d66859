use clubdir::client::RestClient;
use clubdir::config::Config;
use clubdir::directions::{
    DirectionsOutcome, DirectionsResolver, DispatchError, LocationPlatform, NavigationRequest,
    Provider,
};
use clubdir::gateway::Gateway;
use clubdir::model::{Club, ProfilePatch};
use clubdir::screen::{DirectoryEvent, DirectoryScreen};
use clubdir::session::SessionManager;
use clubdir::storage::{CredentialStore, FileCredentialStore};

use anyhow::Result;
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
use std::env;
use std::io::Write;
use std::sync::Arc;

fn print_help() {
    println!("Clubdir - University Club Directory");
    println!("----------------------------------------");
    println!("Usage: clubdir [-v] <COMMAND> [ARGS]");
    println!();
    println!("Commands:");
    println!("  login <email> [password]      Log in (prompts for the password if omitted)");
    println!("  signup <email> [password]     Create an account");
    println!("  logout                        Forget the stored session");
    println!("  delete-account                Delete the logged-in account");
    println!("  clubs [query] [--stem]        List clubs, filtered locally");
    println!("  search <query>                Search club names on the server");
    println!("  club <id>                     Show one club");
    println!("  directions <id>               Get directions to a club");
    println!("  profile                       Show your profile");
    println!("  profile-set <field>=<value>   Update name, major, year or email");
    println!("  delete-profile                Delete your profile and log out");
    println!();

    if let Ok(path) = Config::get_path_string() {
        println!("Configuration File: {}", path);
    } else {
        println!("Configuration Path: ~/.config/clubdir/config.toml (Standard XDG)");
    }
    println!();
    println!("Config Options:");
    println!("  base_url = \"https://<project>.supabase.co\"");
    println!("  api_key = \"...\"");
    println!("  category_keyword = \"stem\" (Optional)");
    println!("  allow_insecure_certs = false (Optional)");
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn load_or_create_config() -> Result<Config> {
    if let Ok(cfg) = Config::load()
        && cfg.is_complete()
    {
        return Ok(cfg);
    }

    // Config missing? Interactive Prompt!
    println!("Welcome to Clubdir. Config not found.");
    println!("Please enter your backend settings.");
    let cfg = Config {
        base_url: prompt("Base URL (e.g. https://<project>.supabase.co)")?,
        api_key: prompt("API key")?,
        ..Config::default()
    };
    if !cfg.is_complete() {
        anyhow::bail!("Base URL and API key are both required");
    }

    if let Ok(path) = Config::get_path_string() {
        println!("Config saved to: {}", path);
    }
    cfg.save()?;
    Ok(cfg)
}

/// Desktop stand-in for the device: there is no navigation app or `geo:` handler,
/// so every request ends on the web map, which is printed for the user to open.
struct DesktopPlatform;

impl LocationPlatform for DesktopPlatform {
    fn location_service_enabled(&self) -> bool {
        true
    }
    fn location_permission_granted(&self) -> bool {
        true
    }
    fn prompt_enable_service(&self) {}
    fn request_permission(&self) {}
    fn can_handle(&self, _request: &NavigationRequest) -> Result<bool, DispatchError> {
        Ok(false)
    }
    fn launch(&self, request: &NavigationRequest) -> Result<(), DispatchError> {
        match request.provider {
            Provider::WebSearch => {
                println!("Open in your browser: {}", request.uri);
                Ok(())
            }
            _ => Err(DispatchError("not available on desktop".to_string())),
        }
    }
}

fn print_club(club: &Club) {
    println!("{}  [{}]", club.display_name(), club.id);
    for (label, value) in [
        ("Description", &club.description),
        ("Website", &club.website),
        ("Address", &club.address),
        ("Email", &club.email),
        ("Phone", &club.phone),
    ] {
        if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            println!("  {:<12} {}", label, v);
        }
    }
}

/// Prints an event. Returns false for failures.
fn render(event: &DirectoryEvent) -> bool {
    match event {
        DirectoryEvent::ClubsLoaded(clubs) | DirectoryEvent::FilterChanged(clubs) => {
            for club in clubs {
                println!("{:<8} {}", club.id, club.display_name());
            }
            println!("({} clubs)", clubs.len());
            true
        }
        DirectoryEvent::ClubLoaded(club) => {
            print_club(club);
            true
        }
        DirectoryEvent::ClubLoadFailed(e) => {
            eprintln!("Error: {}", e);
            false
        }
        DirectoryEvent::AuthResult(Ok(outcome)) => {
            println!("{:?}", outcome);
            true
        }
        DirectoryEvent::AuthResult(Err(e)) => {
            eprintln!("Error: {}", e);
            false
        }
        DirectoryEvent::DirectionsOutcome(outcome) => match outcome {
            DirectionsOutcome::MissingLocation => {
                eprintln!("Location not available for this club");
                false
            }
            DirectionsOutcome::ServiceDisabled => {
                eprintln!("Please enable location services");
                false
            }
            DirectionsOutcome::PermissionRequired => {
                eprintln!("Location permission is required");
                false
            }
            DirectionsOutcome::Dispatched(provider) => {
                println!("Directions sent to {:?}", provider);
                true
            }
        },
    }
}

async fn drain(screen: &mut DirectoryScreen) -> bool {
    let mut ok = true;
    while let Some(event) = screen.next_event().await {
        ok &= render(&event);
    }
    ok
}

fn credentials_from(args: &[String]) -> Result<(String, String)> {
    let email = match args.first() {
        Some(e) => e.clone(),
        None => prompt("Email")?,
    };
    let password = match args.get(1) {
        Some(p) => p.clone(),
        None => prompt("Password")?,
    };
    Ok((email, password))
}

fn parse_patch(args: &[String]) -> Result<ProfilePatch> {
    let mut patch = ProfilePatch::default();
    for arg in args {
        let Some((field, value)) = arg.split_once('=') else {
            anyhow::bail!("Expected <field>=<value>, got '{}'", arg);
        };
        let value = Some(value.trim().to_string());
        match field.trim() {
            "name" => patch.name = value,
            "major" => patch.major = value,
            "year" => patch.year = value,
            "email" => patch.email = value,
            other => anyhow::bail!("Unknown profile field '{}'", other),
        }
    }
    if patch.is_empty() {
        anyhow::bail!("Nothing to update");
    }
    Ok(patch)
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "-v" || a == "--verbose");
    args.retain(|a| a != "-v" && a != "--verbose");

    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        print_help();
        return Ok(());
    }

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    let cfg = load_or_create_config()?;
    let client = RestClient::new(&cfg.base_url, &cfg.api_key, cfg.allow_insecure_certs)?;
    let credentials: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::open_default()?);
    let session = SessionManager::new(client.clone(), credentials.clone());
    let gateway = Gateway::new(client, credentials);
    let mut screen = DirectoryScreen::new(gateway.clone(), &cfg.category_keyword);

    let command = args.remove(0);
    let ok = match command.as_str() {
        "login" => {
            let (email, password) = credentials_from(&args)?;
            render(&DirectoryEvent::AuthResult(
                session.login(&email, &password).await,
            ))
        }
        "signup" => {
            let (email, password) = credentials_from(&args)?;
            let result = session.signup(&email, &password).await;
            let ok = render(&DirectoryEvent::AuthResult(result));
            if ok {
                println!("Account created. Please log in.");
            }
            ok
        }
        "logout" => render(&DirectoryEvent::AuthResult(session.logout())),
        "delete-account" => render(&DirectoryEvent::AuthResult(
            session.delete_account().await,
        )),
        "clubs" => {
            let stem = args.iter().any(|a| a == "--stem");
            let query = args
                .iter()
                .filter(|a| *a != "--stem")
                .cloned()
                .collect::<Vec<_>>()
                .join(" ");
            // Set before the fetch; the store applies it when the list arrives.
            screen.set_filter(&query, stem);
            screen.refresh();
            drain(&mut screen).await
        }
        "search" => {
            screen.search_remote(&args.join(" "));
            drain(&mut screen).await
        }
        "club" => match args.first() {
            Some(id) => {
                screen.open_club(id);
                drain(&mut screen).await
            }
            None => {
                eprintln!("Usage: clubdir club <id>");
                false
            }
        },
        "directions" => match args.first() {
            Some(id) => match gateway.get_club_by_id(id).await {
                Ok(club) => {
                    let resolver = DirectionsResolver::new(DesktopPlatform);
                    render(&DirectoryEvent::DirectionsOutcome(
                        resolver.resolve_for(&club),
                    ))
                }
                Err(e) => render(&DirectoryEvent::ClubLoadFailed(e)),
            },
            None => {
                eprintln!("Usage: clubdir directions <id>");
                false
            }
        },
        "profile" => match session.current_user_id() {
            Some(user_id) => match gateway.get_profile(&user_id).await {
                Ok(p) => {
                    let show = |v: &Option<String>| v.clone().unwrap_or_default();
                    println!("Name:  {}", show(&p.name));
                    println!("Major: {}", show(&p.major));
                    println!("Year:  {}", show(&p.year));
                    println!("Email: {}", show(&p.email));
                    true
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    false
                }
            },
            None => {
                eprintln!("Not logged in");
                false
            }
        },
        "profile-set" => {
            let patch = parse_patch(&args)?;
            match session.current_user_id() {
                Some(user_id) => match gateway.update_profile(&user_id, &patch).await {
                    Ok(()) => {
                        println!("Profile updated");
                        true
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        false
                    }
                },
                None => {
                    eprintln!("Not logged in");
                    false
                }
            }
        }
        "delete-profile" => match session.current_user_id() {
            Some(user_id) => match gateway.delete_profile(&user_id).await {
                Ok(()) => {
                    println!("Profile deleted, logged out");
                    true
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    false
                }
            },
            None => {
                eprintln!("Not logged in");
                false
            }
        },
        other => {
            eprintln!("Unknown command '{}'. See clubdir --help", other);
            false
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
