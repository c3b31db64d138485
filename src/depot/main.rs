use clap::Parser;
use routeloom::backend::{HttpTransitBackend, TransitBackend};
use routeloom::geocode::{Geocoder, NominatimGeocoder};
use routeloom::models::{DirectionId, DirectionRef, LatLng, RouteId, Waypoint};
use routeloom::palette::{ColorAllocator, css_hex};
use routeloom::resolve::{OsrmRouting, RoutingBackend};
use routeloom::track;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// List every route with its directions
    Routes,
    /// List every stop with coordinates
    Stops,
    /// Write the track of one direction to a file or stdout
    ExportTrack {
        route: i64,
        direction: i64,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Parse a track file and report its points
    CheckTrack { path: PathBuf },
    /// Resolve a drivable path through catalog stops, in the given order
    Resolve {
        /// Stop ids in visit order, at least two
        #[arg(required = true, num_args = 2..)]
        stops: Vec<i64>,
        /// Write the resolved path as a track document
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Look up a place name
    Locate { query: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let api_base =
        std::env::var("ROUTELOOM_API_BASE").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
    let osrm_base = std::env::var("ROUTELOOM_OSRM_BASE")
        .unwrap_or_else(|_| "https://router.project-osrm.org".to_string());

    let cli = Args::parse();

    match cli.cmd {
        Command::Routes => {
            let backend = HttpTransitBackend::new(api_base);
            let routes = backend.list_routes().await?;
            let mut colors = ColorAllocator::new();
            println!("{} routes", routes.len());
            for route in &routes {
                println!("route {} \"{}\" ({})", route.id, route.name, route.bus_type);
                for direction in &route.directions {
                    let badge = css_hex(colors.color_for(DirectionRef::new(route.id, direction.id)));
                    let track = if direction.track.is_some() {
                        "track"
                    } else {
                        "no track"
                    };
                    let sub = if direction.sub_name.is_empty() {
                        String::new()
                    } else {
                        format!(" ({})", direction.sub_name)
                    };
                    println!(
                        "  {} {}{}  fare {}  {:.2} km  {} stops  {}  {}",
                        direction.id,
                        direction.kind,
                        sub,
                        direction.ticket_price,
                        direction.distance,
                        direction.stops.len(),
                        badge,
                        track,
                    );
                }
            }
            Ok(())
        }
        Command::Stops => {
            let backend = HttpTransitBackend::new(api_base);
            let stops = backend.list_stops().await?;
            println!("{} stops", stops.len());
            for stop in &stops {
                println!("  {}  {}  {},{}", stop.id, stop.name, stop.lat, stop.lng);
            }
            Ok(())
        }
        Command::ExportTrack {
            route,
            direction,
            out,
        } => {
            let backend = HttpTransitBackend::new(api_base);
            let routes = backend.list_routes().await?;
            let wanted = DirectionRef::new(RouteId(route), DirectionId(direction));
            let Some(route) = routes.iter().find(|r| r.id == wanted.route) else {
                anyhow::bail!("no route with id {}", wanted.route);
            };
            let Some(direction) = route.direction(wanted.direction) else {
                anyhow::bail!("route \"{}\" has no direction {}", route.name, wanted.direction);
            };
            // Directions saved without a resolved line still export, as
            // a track through their stop sequence.
            let document = match direction.track.as_deref() {
                Some(stored) => stored.to_string(),
                None => {
                    let points: Vec<LatLng> =
                        direction.stops.iter().map(|stop| stop.at()).collect();
                    if points.is_empty() {
                        anyhow::bail!("direction {} has no track and no stops", wanted);
                    }
                    track::encode(&route.name, &points)
                }
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, &document)?;
                    println!("wrote {} bytes to {}", document.len(), path.display());
                }
                None => print!("{}", document),
            }
            Ok(())
        }
        Command::CheckTrack { path } => {
            let text = std::fs::read_to_string(&path)?;
            let waypoints = track::decode(&text)?;
            println!("{}: {} points", path.display(), waypoints.len());
            for waypoint in &waypoints {
                println!("  {}  {},{}", waypoint.name, waypoint.at.lat, waypoint.at.lng);
            }
            Ok(())
        }
        Command::Resolve { stops, out } => {
            let backend = HttpTransitBackend::new(api_base);
            let catalog = backend.list_stops().await?;
            let waypoints = stops
                .iter()
                .map(|id| {
                    catalog
                        .iter()
                        .find(|stop| stop.id.0 == *id)
                        .map(Waypoint::from_stop)
                        .ok_or_else(|| anyhow::anyhow!("no stop with id {}", id))
                })
                .collect::<anyhow::Result<Vec<Waypoint>>>()?;
            let routing = OsrmRouting::new(osrm_base);
            let paths = routing.resolve(&waypoints).await?;
            let Some(path) = paths.first() else {
                anyhow::bail!("routing produced no candidates");
            };
            println!(
                "{:.2} km over {} points",
                path.distance_meters / 1000.0,
                path.points.len()
            );
            if let Some(target) = out {
                let name = format!(
                    "{} to {}",
                    waypoints[0].name,
                    waypoints[waypoints.len() - 1].name
                );
                let document = track::encode(&name, &path.points);
                std::fs::write(&target, &document)?;
                println!("wrote track to {}", target.display());
            }
            Ok(())
        }
        Command::Locate { query } => {
            let geocoder = NominatimGeocoder::openstreetmap();
            let hits = geocoder.search(&query).await?;
            if hits.is_empty() {
                println!("nothing found for \"{}\"", query);
            }
            for hit in &hits {
                println!("  {},{}  {}", hit.at.lat, hit.at.lng, hit.name);
            }
            Ok(())
        }
    }
}
