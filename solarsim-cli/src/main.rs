use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use solarsim_core::params::KPH_PER_MPS;
use solarsim_core::prelude::*;

/// Wrapper for solarsim.
/// After running `cargo build --release`, run with
/// ```bash
/// ./target/release/solarsim-cli optimize --veh-file vehicles/reference.yaml --ghi10 750 --ghi90 820
/// ```
/// For dataset generation, run with
/// ```bash
/// ./target/release/solarsim-cli dataset --config dataset.yaml --out samples.csv
/// ```
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct SolarSimApi {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find the energy-optimal cruising speed for a single scenario
    Optimize {
        /// Path to vehicle file (yaml or json); reference vehicle if omitted
        #[clap(long, value_parser)]
        veh_file: Option<PathBuf>,
        /// Ambient temperature [°C]
        #[clap(long, value_parser, default_value_t = 25.0)]
        te_amb: f64,
        /// Road grade as rise over run; positive is uphill
        #[clap(long, value_parser, default_value_t = 0.0)]
        grade: f64,
        /// Headwind [m/s]
        #[clap(long, value_parser, default_value_t = 0.0)]
        wind: f64,
        /// 10th-percentile irradiance forecast [W/m^2]
        #[clap(long, value_parser, default_value_t = 0.0)]
        ghi10: f64,
        /// 90th-percentile irradiance forecast [W/m^2]
        #[clap(long, value_parser, default_value_t = 0.0)]
        ghi90: f64,
        /// Elevation above sea level [m]
        #[clap(long, value_parser, default_value_t = 0.0)]
        elevation: f64,
        /// Trip distance [m]
        #[clap(long, value_parser, default_value_t = 150e3)]
        distance_m: f64,
        /// State of charge at departure
        #[clap(long, value_parser, default_value_t = 0.9)]
        init_soc: f64,
        /// Nominal battery capacity [Wh]
        #[clap(long, value_parser, default_value_t = 4960.0)]
        battery_wh: f64,
        /// Lower speed bound [m/s]
        #[clap(long, value_parser, default_value_t = 10.0 / KPH_PER_MPS)]
        min_speed: f64,
        /// Upper speed bound [m/s]
        #[clap(long, value_parser, default_value_t = 60.0 / KPH_PER_MPS)]
        max_speed: f64,
        /// Emit the full result as JSON instead of a summary
        #[clap(long, action)]
        json: bool,
    },
    /// Generate a labeled optimal-speed dataset as CSV
    Dataset {
        /// Path to dataset config file (yaml or json); defaults if omitted
        #[clap(long, value_parser)]
        config: Option<PathBuf>,
        /// Path to vehicle file (yaml or json); reference vehicle if omitted
        #[clap(long, value_parser)]
        veh_file: Option<PathBuf>,
        /// Path of the CSV file to write
        #[clap(long, value_parser)]
        out: PathBuf,
        /// Override the configured number of samples
        #[clap(long, value_parser)]
        num_samples: Option<usize>,
        /// Override the configured master seed
        #[clap(long, value_parser)]
        seed: Option<u64>,
    },
}

fn load_vehicle(veh_file: &Option<PathBuf>) -> anyhow::Result<SolarVehicle> {
    match veh_file {
        Some(path) => SolarVehicle::from_file(path),
        None => {
            info!("no vehicle file given; using the reference vehicle");
            Ok(SolarVehicle::mock_vehicle())
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let api = SolarSimApi::parse();
    match api.command {
        Command::Optimize {
            veh_file,
            te_amb,
            grade,
            wind,
            ghi10,
            ghi90,
            elevation,
            distance_m,
            init_soc,
            battery_wh,
            min_speed,
            max_speed,
            json,
        } => {
            let veh = load_vehicle(&veh_file)?;
            let env = Environment {
                te_amb_deg_c: te_amb,
                grade,
                wind_mps: wind,
                ghi10_w_per_m2: ghi10,
                ghi90_w_per_m2: ghi90,
                elevation_m: elevation,
            };
            let trip = TripSpec {
                distance_m,
                init_soc,
                battery_capacity_wh: battery_wh,
            };
            let bounds = SpeedBounds::new(min_speed, max_speed)?;
            let res = optimize(
                &veh,
                &env,
                &trip,
                &bounds,
                &OptimizeParams::default(),
                &PhysicalProperties::default(),
            )?;
            if json {
                println!("{}", serde_json::to_string_pretty(&res)?);
            } else {
                println!(
                    "Optimal speed: {:.2} m/s ({:.1} km/h)",
                    res.speed_opt_mps,
                    res.speed_opt_mps * KPH_PER_MPS
                );
                println!("Final SOC: {:.4}", res.sim.soc_final);
                println!("Energy consumed: {:.1} Wh", res.sim.energy_consumed_wh);
                println!("Solar energy gained: {:.1} Wh", res.sim.solar_energy_wh);
                println!("Trip time: {:.0} s", res.sim.trip_time_s);
                if res.sim.depleted {
                    println!("Battery depleted before trip end");
                }
                if !res.converged {
                    println!("Search did not converge; best sampled speed reported");
                }
            }
        }
        Command::Dataset {
            config,
            veh_file,
            out,
            num_samples,
            seed,
        } => {
            let mut config = match config {
                Some(path) => DatasetConfig::from_file(path)?,
                None => DatasetConfig::default(),
            };
            if let Some(n) = num_samples {
                config.num_samples = n;
            }
            if let Some(s) = seed {
                config.seed = s;
            }
            let veh = load_vehicle(&veh_file)?;
            info!(
                "generating {} samples with seed {}",
                config.num_samples, config.seed
            );
            generate_to_csv(&config, &veh, &PhysicalProperties::default(), &out)?;
            println!("Wrote {} samples to {}", config.num_samples, out.display());
        }
    }
    Ok(())
}
