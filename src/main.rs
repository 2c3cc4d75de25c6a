use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use skycast_core::{AppError, Config};
use skycast_weather::{
    spawn_dashboard_refresh, DashboardState, JsonFilePreferences, UnitSystem, WeatherService,
    WeatherSnapshot,
};

const USAGE: &str = "\
Usage: skycast [command]

Commands:
  dashboard               Current weather for favorites, searches and defaults (default)
  watch                   Keep the dashboard refreshed until Ctrl-C
  detail <location-id>    Current conditions and 5-day forecast
  search <query>          Location suggestions
  add <location>          Remember a searched location
  favorite <location>     Toggle a favorite location
  units [metric|imperial] Show or switch the unit system";

#[tokio::main]
async fn main() -> Result<()> {
    skycast_core::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args).await {
        tracing::error!("{}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: &[String]) -> Result<(), AppError> {
    let (config, _) = Config::load_validated()?;
    let prefs = Arc::new(JsonFilePreferences::open(config.preferences_path()));
    let service = Arc::new(
        WeatherService::new(&config, prefs).map_err(|e| AppError::Service(e.to_string()))?,
    );

    let command = args.first().map(String::as_str).unwrap_or("dashboard");
    let rest = args.get(1..).unwrap_or_default().join(" ");

    match command {
        "dashboard" => {
            let outcome = service.fetch_dashboard().await;
            if outcome.all_failed {
                return Err(AppError::Service("no weather data available".to_string()));
            }
            print_snapshots(&outcome.snapshots, service.unit());
        }
        "watch" => watch(service, Duration::from_secs(config.dashboard.refresh_secs)).await?,
        "detail" => {
            let id: u64 = rest
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("expected a numeric location id, got {:?}", rest))?;
            let detail = service
                .fetch_detail(id)
                .await
                .ok_or_else(|| AppError::Service(format!("no detail for location {}", id)))?;

            let unit = service.unit();
            print_snapshots(std::slice::from_ref(&detail.current), unit);
            println!();
            for day in detail.forecast.daily_summaries() {
                println!(
                    "  {}  {:>6.1} / {:>6.1}{}  humidity {:>3.0}%  wind {:.1} {}",
                    day.date,
                    day.min,
                    day.max,
                    unit.temperature_symbol(),
                    day.avg_humidity,
                    day.avg_wind_speed,
                    unit.wind_speed_unit()
                );
            }
        }
        "search" => {
            let suggestions = service.suggest(&rest, None).await;
            if suggestions.is_empty() {
                println!("No matching locations");
            }
            for s in suggestions {
                println!("  {}  ({:.2}, {:.2})", s.label(), s.latitude, s.longitude);
            }
        }
        "add" => {
            if rest.trim().is_empty() {
                eprintln!("Usage: skycast add <location>");
                std::process::exit(2);
            }
            if service.submit_search(&rest) {
                println!("Added {} to the dashboard", rest.trim());
            } else {
                println!("{} is already on the dashboard", rest.trim());
            }
        }
        "favorite" => {
            let name = rest.trim();
            if name.is_empty() {
                eprintln!("Usage: skycast favorite <location>");
                std::process::exit(2);
            }
            if service.locations().toggle_favorite(name) {
                println!("{} is now a favorite", name);
            } else {
                println!("{} is no longer a favorite", name);
            }
        }
        "units" => {
            if rest.trim().is_empty() {
                println!("{}", service.unit());
            } else {
                let unit: UnitSystem = rest.parse().map_err(anyhow::Error::from)?;
                service.set_unit(unit);
                println!("Units set to {}", unit);
            }
        }
        "help" | "--help" | "-h" => println!("{}", USAGE),
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

async fn watch(service: Arc<WeatherService>, period: Duration) -> Result<(), AppError> {
    let (handle, mut rx) = spawn_dashboard_refresh(service.clone(), period);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                match &*rx.borrow_and_update() {
                    DashboardState::Loading => println!("Loading..."),
                    DashboardState::NoData => println!("No weather data available"),
                    DashboardState::Ready(snapshots) => print_snapshots(snapshots, service.unit()),
                }
            }
        }
    }

    handle.join().await;
    Ok(())
}

fn print_snapshots(snapshots: &[WeatherSnapshot], unit: UnitSystem) {
    for s in snapshots {
        let place = match &s.country {
            Some(country) => format!("{}, {}", s.name, country),
            None => s.name.clone(),
        };
        println!(
            "{:<24} {:>6.1}{}  {:<20} humidity {:>3}%  wind {:.1} {}  [{}]",
            place,
            s.temperature,
            unit.temperature_symbol(),
            s.condition.description,
            s.humidity,
            s.wind_speed,
            unit.wind_speed_unit(),
            s.id
        );
    }
}
