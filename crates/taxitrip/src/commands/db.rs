use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use clap::Subcommand;
use comfy_table::Table;
use taxitrip_core::db;
use taxitrip_core::repository::{PostgresTripRepository, StoredTrip, TripRepository};
use taxitrip_core::DatabaseSettings;

#[derive(Subcommand, Debug)]
pub enum StatsCommands {
    /// Aggregate statistics for one pickup date
    Daily {
        #[arg(long)]
        date: NaiveDate,
        /// Also store the result in the aggregation table
        #[arg(long)]
        refresh: bool,
    },
    /// Trip counts per pickup hour for one date
    Hourly {
        #[arg(long)]
        date: NaiveDate,
    },
    /// Hourly and passenger distributions over a pickup window
    Patterns {
        #[arg(long)]
        start: NaiveDateTime,
        #[arg(long)]
        end: NaiveDateTime,
    },
}

#[derive(Subcommand, Debug)]
pub enum TripsCommands {
    Get {
        id: i64,
    },
    Delete {
        id: i64,
    },
    /// Trips picked up within a window, ordered by pickup time
    Range {
        #[arg(long)]
        start: NaiveDateTime,
        #[arg(long)]
        end: NaiveDateTime,
        #[arg(long, default_value_t = 0)]
        offset: i64,
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },
    /// Trips starting or ending near a point
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,
        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
        #[arg(long, default_value_t = 1.0)]
        radius_km: f64,
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },
}

fn print_trips(trips: &[StoredTrip]) {
    let mut table = Table::new();
    table.set_header(vec![
        "id", "vendor", "pickup", "dropoff", "passengers", "miles", "mph", "category",
    ]);
    for stored in trips {
        let record = &stored.trip.record;
        let features = &stored.trip.features;
        table.add_row(vec![
            stored.id.to_string(),
            record.vendor_id.clone(),
            record.pickup_datetime.to_string(),
            record.dropoff_datetime.to_string(),
            record.passenger_count.to_string(),
            format!("{:.3}", features.trip_distance),
            format!("{:.2}", features.average_speed),
            features.time_category.to_string(),
        ]);
    }
    println!("{table}");
    println!("{} trips", trips.len());
}

pub async fn handle_stats_command(command: StatsCommands) -> Result<()> {
    let repo = PostgresTripRepository::new(db::connect(&DatabaseSettings::from_env()?).await?);

    match command {
        StatsCommands::Daily { date, refresh } => {
            let stats = if refresh {
                repo.refresh_daily_aggregate(date).await?
            } else {
                repo.daily_statistics(date).await?
            };
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsCommands::Hourly { date } => {
            let counts = repo.hourly_counts(date).await?;
            let mut table = Table::new();
            table.set_header(vec!["hour", "trips"]);
            for (hour, count) in counts {
                table.add_row(vec![hour.to_string(), count.to_string()]);
            }
            println!("{table}");
        }
        StatsCommands::Patterns { start, end } => {
            let patterns = repo.trip_patterns(start, end).await?;
            println!("{}", serde_json::to_string_pretty(&patterns)?);
        }
    }
    Ok(())
}

pub async fn handle_trips_command(command: TripsCommands) -> Result<()> {
    let repo = PostgresTripRepository::new(db::connect(&DatabaseSettings::from_env()?).await?);

    match command {
        TripsCommands::Get { id } => {
            let trip = repo.get_trip(id).await?;
            println!("{}", serde_json::to_string_pretty(&trip)?);
        }
        TripsCommands::Delete { id } => {
            if repo.delete_trip(id).await? {
                println!("trip {id} deleted");
            } else {
                println!("trip {id} not found");
            }
        }
        TripsCommands::Range {
            start,
            end,
            offset,
            limit,
        } => {
            let trips = repo.trips_by_timeframe(start, end, offset, limit).await?;
            print_trips(&trips);
        }
        TripsCommands::Nearby {
            latitude,
            longitude,
            radius_km,
            limit,
        } => {
            let trips = repo.trips_near(latitude, longitude, radius_km, limit).await?;
            print_trips(&trips);
        }
    }
    Ok(())
}
