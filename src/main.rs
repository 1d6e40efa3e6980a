// Entry point and interactive menu.
//
// - Option [1] loads the tables, relations and map layers.
// - Option [2] changes the regime / endemicity / country selection.
// - Option [3] writes rankings, map layers and a JSON summary, and previews
//   the main tables on the console.
use once_cell::sync::Lazy;
use prevalence_maps::config::AppConfig;
use prevalence_maps::output::preview_table_rows;
use prevalence_maps::pipeline::{export_outputs, load_inputs};
use prevalence_maps::reports::{generate_country_states, generate_ranking, generate_top_performers};
use prevalence_maps::util::{format_int, format_number};
use prevalence_maps::{DataApi, Result};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

// Loaded inputs and the derivation graph live for the whole session, so
// outputs can be regenerated under different selections without reloading.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to read config, using defaults: {}", e);
        AppConfig::default()
    });
    let mut api = DataApi::new(config.graph_options());
    api.set_selection(config.selection.clone());
    Mutex::new(AppState { config, api, loaded: false })
});

struct AppState {
    config: AppConfig,
    api: DataApi,
    loaded: bool,
}

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    prompt("Enter choice: ")
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match prompt("Back to menu (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn handle_load() {
    let mut state = APP_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    let AppState { config, api, loaded } = &mut *state;
    match load_inputs(api, config) {
        Ok(reports) => {
            for (level, report) in reports {
                println!(
                    "Loaded {} {} rows ({} skipped due to parse errors).",
                    format_int(report.loaded_rows as u64),
                    level.label(),
                    format_int(report.parse_errors as u64)
                );
            }
            println!();
            *loaded = true;
        }
        Err(e) => eprintln!("Failed to load data: {}\n", e),
    }
}

fn handle_set_filter() {
    let mut state = APP_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    let api = &mut state.api;

    let regimes = api.regimes();
    for (i, regime) in regimes.iter().enumerate() {
        println!("[{}] {}", i + 1, regime);
    }
    let current = api.selection();
    let choice = prompt(&format!("Regime (current {}): ", current.regime));
    if !choice.is_empty() {
        match choice.parse::<usize>().ok().and_then(|i| regimes.get(i.wrapping_sub(1))) {
            Some(regime) => api.set_regime(*regime),
            None => match choice.parse() {
                Ok(regime) => api.set_regime(regime),
                Err(e) => println!("{}; keeping {}", e, current.regime),
            },
        }
    }

    let endemicity = prompt("Endemicity (blank for any): ");
    api.set_endemicity(Some(endemicity));

    if let Ok(suggestions) = api.country_suggestions() {
        let shown: Vec<String> = suggestions
            .iter()
            .take(10)
            .map(|s| format!("{} ({})", s.name, s.id))
            .collect();
        if !shown.is_empty() {
            println!("Countries: {}", shown.join(", "));
        }
    }
    let country = prompt("Country code (blank for all): ");
    api.set_country(Some(country));
    println!("Selection: {:?}\n", api.selection());
}

fn generate(state: &AppState) -> Result<()> {
    let AppState { config, api, .. } = state;
    let written = export_outputs(api, config, chrono::Utc::now())?;

    let countries = api.country_data()?;
    println!("Country ranking ({} countries)\n", countries.data.len());
    preview_table_rows(&generate_ranking(&countries), config.preview_rows);

    println!("Top affected countries (by performance)\n");
    preview_table_rows(&generate_top_performers(&countries, config.top_n), config.top_n);

    println!("States by country\n");
    preview_table_rows(&generate_country_states(&*api.state_by_country_data()?), config.preview_rows);

    if let Some(selected) = &*api.selected_country()? {
        println!(
            "Selected: {} ({}), performance {}\n",
            selected.entity.name,
            selected.entity.id,
            format_number(selected.performance, 2)
        );
    }

    let stats = countries.stats.prevalence;
    println!(
        "{{\"min_prevalence\": {}, \"max_prevalence\": {}}}",
        format_number(stats.min, 2),
        format_number(stats.max, 2)
    );
    println!("({} files written to {})\n", written.len(), config.output_dir.display());
    Ok(())
}

fn handle_generate() {
    let state = APP_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    if !state.loaded {
        println!("Error: No data loaded. Please load the data files first (option 1).\n");
        return;
    }
    println!("Generating maps and reports...\n");
    if let Err(e) = generate(&state) {
        eprintln!("Failed to generate outputs: {}\n", e);
    }
}

fn main() {
    env_logger::init();
    loop {
        println!("Prevalence Maps");
        println!("[1] Load data files");
        println!("[2] Set filter");
        println!("[3] Generate maps and reports\n");
        match read_choice().as_str() {
            "1" => handle_load(),
            "2" => handle_set_filter(),
            "3" => {
                println!();
                handle_generate();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}
