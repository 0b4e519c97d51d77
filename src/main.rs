// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use calf_ledger::{
    filter_by_property, order_for_display, parse_br_date, request_timeline, CalfRecord,
    ChartSummary, Config, Notice, NoticeLevel, RecordStore, TreatmentRecord, ALL_PROPERTIES,
};

#[derive(Parser, Debug)]
#[command(name = "calf-ledger", version, about = "Calf registry and treatment log")]
struct Cli {
    /// Directory holding the two tables (overrides CALF_LEDGER_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive browser (default)
    Ui,
    /// Register a calf
    AddCalf {
        #[arg(long)]
        property: String,
        #[arg(long)]
        ear_tag: String,
        /// Birth date, DD/MM/YYYY
        #[arg(long)]
        birth: String,
        #[arg(long, default_value = "")]
        mother: String,
        #[arg(long, default_value_t = 0.0)]
        weight: f64,
        #[arg(long, default_value_t = 0.0)]
        height: f64,
        #[arg(long, default_value_t = 0.0)]
        colostrum: f64,
        #[arg(long, default_value_t = 0.0)]
        brix: f64,
    },
    /// Register a treatment
    AddTreatment {
        #[arg(long)]
        property: String,
        #[arg(long)]
        ear_tag: String,
        #[arg(long)]
        reason: String,
        #[arg(long, default_value = "")]
        medication_type: String,
        #[arg(long, default_value = "")]
        medication: String,
        #[arg(long, default_value = "")]
        dose: String,
        /// First dose date, DD/MM/YYYY
        #[arg(long)]
        first_dose: String,
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        doses: u32,
        #[arg(long, default_value = "")]
        responsible: String,
    },
    /// Print a table, optionally filtered by property
    List {
        #[arg(value_enum)]
        table: TableName,
        #[arg(long, default_value = ALL_PROPERTIES)]
        property: String,
    },
    /// Print the chart aggregates
    Report,
    /// Print the timeline of one or more calves
    Timeline { tags: Vec<String> },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TableName {
    Calves,
    Treatments,
}

/// The TUI owns the terminal, so stderr logging stays quiet there
fn default_log_filter(command: &Command) -> &'static str {
    match command {
        Command::Ui => "warn",
        _ => "info",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Ui);
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter(&command)),
    )
    .init();

    let mut config = Config::from_env();
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }

    let mut store = RecordStore::from_config(&config);

    match command {
        Command::Ui => run_ui_mode(store)?,
        Command::AddCalf {
            property,
            ear_tag,
            birth,
            mother,
            weight,
            height,
            colostrum,
            brix,
        } => {
            let birth = parse_br_date("Nascimento", &birth)?;
            let record = CalfRecord::new(property, ear_tag, birth)
                .with_mother(mother)
                .with_measurements(weight, height)
                .with_colostrum(colostrum, brix);
            let saved = save_calf(&mut store, record);
            print_notices(&mut store);
            saved?;
        }
        Command::AddTreatment {
            property,
            ear_tag,
            reason,
            medication_type,
            medication,
            dose,
            first_dose,
            doses,
            responsible,
        } => {
            let first_dose = parse_br_date("Data da 1ª Dose", &first_dose)?;
            let record = TreatmentRecord::new(property, ear_tag, reason, first_dose)
                .with_medication(medication_type, medication, dose)
                .with_dose_count(doses)
                .with_responsible(responsible);
            let saved = save_treatment(&mut store, record);
            print_notices(&mut store);
            saved?;
        }
        Command::List { table, property } => {
            print_notices(&mut store);
            match table {
                TableName::Calves => print_calves(&filter_by_property(store.calves(), &property)),
                TableName::Treatments => {
                    print_treatments(&filter_by_property(store.treatments(), &property))
                }
            }
        }
        Command::Report => {
            print_notices(&mut store);
            print_report(&ChartSummary::from_treatments(store.treatments()));
        }
        Command::Timeline { tags } => {
            print_notices(&mut store);
            let events = request_timeline(&tags, store.calves(), store.treatments())?;
            if events.is_empty() {
                println!("Nenhum evento para {}", tags.join(", "));
            }
            for event in order_for_display(events) {
                println!(
                    "{}  {:<12} {}",
                    event.date.format("%d/%m/%Y"),
                    event.category.name(),
                    event.label
                );
            }
        }
    }

    Ok(())
}

// Pending load notices are left in the store so the caller reports them
// together with the save outcome
fn save_calf(store: &mut RecordStore, record: CalfRecord) -> Result<()> {
    store
        .add_calf(record)
        .with_context(|| format!("Failed to save {}", store.calf_path().display()))
}

fn save_treatment(store: &mut RecordStore, record: TreatmentRecord) -> Result<()> {
    store
        .add_treatment(record)
        .with_context(|| format!("Failed to save {}", store.treatment_path().display()))
}

fn print_notices(store: &mut RecordStore) {
    for notice in store.take_notices() {
        print_notice(&notice);
    }
}

fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Info => println!("✓ {}", notice.text),
        NoticeLevel::Warning => eprintln!("⚠️  {}", notice.text),
    }
}

fn print_calves(calves: &[CalfRecord]) {
    println!(
        "\n{:<16} {:<8} {:<11} {:<8} {:>7} {:>7} {:>8} {:>6}",
        "Propriedade", "Brinco", "Nascimento", "Mãe", "Peso", "Altura", "Colostro", "Brix"
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for c in calves {
        println!(
            "{:<16} {:<8} {:<11} {:<8} {:>7.1} {:>7.1} {:>8.1} {:>6.1}",
            c.property,
            c.ear_tag,
            c.birth_date,
            c.mother_ear_tag,
            c.weight_kg,
            c.height_cm,
            c.colostrum_volume,
            c.brix_score
        );
    }
    println!("\n{} bezerras", calves.len());
}

fn print_treatments(treatments: &[TreatmentRecord]) {
    println!(
        "\n{:<16} {:<8} {:<20} {:<20} {:<10} {:<11} {:>5} {:<12}",
        "Propriedade", "Brinco", "Razão", "Medicamento", "Dose", "1ª Dose", "Doses", "Responsável"
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for t in treatments {
        println!(
            "{:<16} {:<8} {:<20} {:<20} {:<10} {:<11} {:>5} {:<12}",
            t.property,
            t.calf_ear_tag,
            t.reason,
            t.medication_name,
            t.dose,
            t.first_dose_date,
            t.dose_count,
            t.responsible
        );
    }
    println!("\n{} tratamentos", treatments.len());
}

fn print_report(summary: &ChartSummary) {
    println!("📊 Gráficos - {} tratamentos", summary.total_treatments());

    println!("\nNúmero de Tratamentos por Propriedade");
    for (property, n) in &summary.by_property {
        println!("  {:<24} {:>5}", property, n);
    }

    println!("\nDistribuição de Tratamentos por Tipo");
    for (reason, n) in &summary.by_reason {
        println!("  {:<24} {:>5}", reason, n);
    }

    println!("\nTratamentos por Responsável");
    for (who, n) in &summary.by_responsible {
        println!("  {:<24} {:>5}", who, n);
    }

    println!("\nNúmero de Doses Administradas");
    for (doses, n) in &summary.by_dose_count {
        println!("  {:<24} {:>5}", doses, n);
    }

    println!("\nTratamentos ao Longo do Tempo");
    match &summary.over_time_error {
        Some(err) => eprintln!("  ❌ {}", err),
        None => {
            for (day, n) in &summary.over_time {
                println!("  {:<24} {:>5}", day.format("%d/%m/%Y"), n);
            }
        }
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(store: RecordStore) -> Result<()> {
    let mut app = ui::App::new(store);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_store: RecordStore) -> Result<()> {
    Err(anyhow::anyhow!(
        "TUI mode not available; rebuild with `--features tui` or use the list/report/timeline commands"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_log_filter_is_quiet_only_for_the_ui() {
        assert_eq!(default_log_filter(&Command::Ui), "warn");
        assert_eq!(default_log_filter(&Command::Report), "info");
        assert_eq!(default_log_filter(&Command::Timeline { tags: vec![] }), "info");
    }

    #[test]
    fn test_cli_defaults_to_ui() {
        let cli = Cli::parse_from(["calf-ledger"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["calf-ledger", "--data-dir", "/tmp/x", "report"]);
        assert!(matches!(cli.command, Some(Command::Report)));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn test_add_keeps_recovered_load_warning_visible() {
        let dir = tempdir().unwrap();
        let treatment_path = dir.path().join("treatments.csv");
        fs::write(&treatment_path, "Propriedade;Brinco\nFazenda A;001\n").unwrap();
        let mut store = RecordStore::open(dir.path().join("calves.csv"), &treatment_path);

        let first_dose = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        save_treatment(
            &mut store,
            TreatmentRecord::new("Fazenda A", "001", "Diarreia", first_dose),
        )
        .unwrap();

        let notices = store.take_notices();
        assert!(notices
            .iter()
            .any(|n| n.level == NoticeLevel::Warning && n.text.contains("tratamentos")));
        assert!(notices
            .iter()
            .any(|n| n.text == "Dados de tratamentos salvos com sucesso."));
    }

    #[test]
    fn test_failed_save_reports_path() {
        let dir = tempdir().unwrap();
        let calf_path = dir.path().join("calves.csv");
        fs::create_dir(&calf_path).unwrap();
        let mut store = RecordStore::open(&calf_path, dir.path().join("treatments.csv"));

        let birth = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let err = save_calf(&mut store, CalfRecord::new("Fazenda A", "001", birth)).unwrap_err();

        assert!(err.to_string().contains("calves.csv"));
        assert!(store
            .take_notices()
            .iter()
            .any(|n| n.level == NoticeLevel::Warning));
    }
}
