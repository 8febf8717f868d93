//! CLI tool for turning spreadsheets into chart decks.

use anyhow::{Context, Result};
use chartdeck_core::enumerate::DEFAULT_MAX_CHARTS;
use chartdeck_core::{
    render_charts, ChartData, ChartEnumerator, ChartKind, ChartRenderer, ChartSpec, ManualChart,
    SpreadsheetFormat, Table,
};
use chartdeck_pptx::{ExportOptions, PptxExporter, PptxInspector};
use chartdeck_render::{PlottersRenderer, DEFAULT_HEIGHT, DEFAULT_WIDTH, MAX_SIDE};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Build charts from Excel sheets and export them to PowerPoint.
#[derive(Parser, Debug)]
#[command(name = "chartdeck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the columns of a sheet with their classification
    Columns {
        #[command(flatten)]
        input: Input,
    },

    /// List the charts generated for a sheet
    Charts {
        #[command(flatten)]
        input: Input,

        /// Print chart specs as JSON
        #[arg(long)]
        json: bool,

        /// Maximum number of generated charts (default 200, 0 for no limit)
        #[arg(long)]
        max_charts: Option<usize>,
    },

    /// Export a PowerPoint deck with one slide per chart
    Export {
        #[command(flatten)]
        input: Input,

        /// JSON file with chart specs to export instead of the generated ones
        #[arg(long)]
        specs: Option<PathBuf>,

        /// Output directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// File name prefix
        #[arg(long, default_value = chartdeck_pptx::options::DEFAULT_PREFIX)]
        prefix: String,

        /// Deck label, appended to the prefix
        #[arg(long, default_value = chartdeck_pptx::options::DEFAULT_LABEL)]
        label: String,

        /// Append a timestamp to the file name
        #[arg(long)]
        unique: bool,

        /// Skip chart images and put data previews on every slide
        #[arg(long)]
        no_images: bool,

        /// Maximum number of generated charts (default 200, 0 for no limit)
        #[arg(long)]
        max_charts: Option<usize>,

        #[command(flatten)]
        size: ImageSize,
    },

    /// Write one PNG per generated chart
    Png {
        #[command(flatten)]
        input: Input,

        /// Output directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Maximum number of generated charts (default 200, 0 for no limit)
        #[arg(long)]
        max_charts: Option<usize>,

        #[command(flatten)]
        size: ImageSize,
    },

    /// Build a single chart from chosen columns and write it as PNG
    Chart {
        #[command(flatten)]
        input: Input,

        /// Chart type (bar, line, scatter, pie, donut, bubble, area, radar, mixed, funnel)
        #[arg(short, long)]
        kind: ChartKind,

        /// X-axis column
        #[arg(short, long)]
        x: String,

        /// Y-axis column(s)
        #[arg(short, long, required = true, num_args = 1..)]
        y: Vec<String>,

        /// Column to split series by
        #[arg(long)]
        color: Option<String>,

        /// Chart title
        #[arg(long)]
        title: Option<String>,

        /// Output PNG path (default: <x>_<y>_chart.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        size: ImageSize,
    },

    /// Print the slides of an exported deck
    Inspect {
        /// PowerPoint deck (.pptx)
        deck: PathBuf,
    },
}

#[derive(Args, Debug)]
struct Input {
    /// Input spreadsheet (.xlsx or .xls)
    file: PathBuf,

    /// Sheet name (default: first sheet)
    #[arg(short, long)]
    sheet: Option<String>,
}

#[derive(Args, Debug)]
struct ImageSize {
    /// Image width in pixels (200 to 8192)
    #[arg(long, default_value_t = DEFAULT_WIDTH, value_parser = side_parser())]
    width: u32,

    /// Image height in pixels (200 to 8192)
    #[arg(long, default_value_t = DEFAULT_HEIGHT, value_parser = side_parser())]
    height: u32,
}

fn side_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(200..=i64::from(MAX_SIDE))
}

impl ImageSize {
    fn renderer(&self) -> PlottersRenderer {
        PlottersRenderer::new().with_size(self.width, self.height)
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Columns { input } => {
            let table = load_table(&input)?;
            println!("{} ({} rows)", table.source, table.row_count());
            for column in table.columns() {
                println!("  {:<32} {}", column.name, column.kind.as_str());
            }
        }

        Command::Charts {
            input,
            json,
            max_charts,
        } => {
            let table = load_table(&input)?;
            let specs = enumerator(max_charts).enumerate(&table);
            if json {
                println!("{}", serde_json::to_string_pretty(&specs)?);
            } else {
                for (index, spec) in specs.iter().enumerate() {
                    println!("{:>3}. [{}] {}", index + 1, spec.kind, spec.display_title());
                }
            }
        }

        Command::Export {
            input,
            specs,
            output_dir,
            prefix,
            label,
            unique,
            no_images,
            max_charts,
            size,
        } => {
            let table = load_table(&input)?;
            let specs = match specs {
                Some(path) => limit(read_specs(&path)?, max_charts),
                None => enumerator(max_charts).enumerate(&table),
            };
            if specs.is_empty() {
                log::warn!("No charts for {}; the deck will be empty", table.source);
            }

            let renderer = size.renderer();
            let renderer: Option<&dyn ChartRenderer> =
                if no_images { None } else { Some(&renderer) };
            let options = ExportOptions::new()
                .with_prefix(prefix)
                .with_label(label)
                .with_unique(unique);
            let path = options.output_path(&output_dir);

            let written = PptxExporter::with_options(options)
                .export_specs(&specs, &table, renderer, &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", written.display());
        }

        Command::Png {
            input,
            output_dir,
            max_charts,
            size,
        } => {
            let table = load_table(&input)?;
            let specs = enumerator(max_charts).enumerate(&table);
            let renderer = size.renderer();
            create_dir(&output_dir)?;

            for (index, chart) in render_charts(&specs, &table, Some(&renderer))
                .into_iter()
                .enumerate()
            {
                let Some(png) = chart.image else {
                    continue;
                };
                let path = output_dir.join(numbered_png_name(index + 1, &chart.spec));
                std::fs::write(&path, png)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("{}", path.display());
            }
        }

        Command::Chart {
            input,
            kind,
            x,
            y,
            color,
            title,
            output,
            size,
        } => {
            let table = load_table(&input)?;
            let mut request = ManualChart::new(kind, x, y);
            if let Some(color) = color {
                request = request.with_color(color);
            }
            if let Some(title) = title {
                request = request.with_title(title);
            }

            let spec = request.build(&table)?;
            let data = ChartData::resolve(&spec, &table)?;
            let png = size
                .renderer()
                .render(&spec, &data)
                .with_context(|| format!("Failed to render {}", spec.display_title()))?;

            let path = output.unwrap_or_else(|| PathBuf::from(spec.png_file_name()));
            std::fs::write(&path, png)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", path.display());
        }

        Command::Inspect { deck } => {
            let file =
                File::open(&deck).with_context(|| format!("Failed to open {}", deck.display()))?;
            let deck = PptxInspector::new().inspect(BufReader::new(file), &file_name(&deck))?;

            println!("{} ({} slides)", deck.source, deck.slides.len());
            for slide in &deck.slides {
                println!(
                    "{:>3}. [{}] {}",
                    slide.number,
                    slide.content_kind(),
                    slide.title().unwrap_or("")
                );
            }
        }
    }

    Ok(())
}

/// Load the selected sheet of a spreadsheet, detecting its format.
fn load_table(input: &Input) -> Result<Table> {
    let path = &input.file;
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);

    // Read magic bytes to detect format
    let mut magic = [0u8; 8];
    let read = reader
        .read(&mut magic)
        .with_context(|| "Failed to read file header")?;

    let format = detect_format(&magic[..read], path)?;
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let filename = file_name(path);
    let sheet = input.sheet.as_deref();

    let table = match format {
        SpreadsheetFormat::Xlsx => {
            log::debug!("Reading as XLSX");
            chartdeck_xlsx::XlsxReader::new().read(reader, &filename, sheet)
        }
        SpreadsheetFormat::Xls => {
            log::debug!("Reading as legacy XLS");
            chartdeck_xls::XlsReader::new().read(reader, &filename, sheet)
        }
    }
    .with_context(|| format!("Failed to read {}", path.display()))?;

    log::debug!(
        "Loaded {} columns x {} rows from {}",
        table.columns().len(),
        table.row_count(),
        table.source
    );
    Ok(table)
}

fn detect_format(magic: &[u8], path: &Path) -> Result<SpreadsheetFormat> {
    SpreadsheetFormat::from_magic(magic)
        .or_else(|| {
            path.extension()
                .and_then(|e| e.to_str())
                .and_then(SpreadsheetFormat::from_extension)
        })
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Could not detect file format of {} (expected .xlsx or .xls)",
                path.display()
            )
        })
}

/// Generated charts are capped at 200 unless `--max-charts` says otherwise.
fn enumerator(max_charts: Option<usize>) -> ChartEnumerator {
    ChartEnumerator::new().with_max_charts(max_charts.unwrap_or(DEFAULT_MAX_CHARTS))
}

fn limit(mut specs: Vec<ChartSpec>, max_charts: Option<usize>) -> Vec<ChartSpec> {
    if let Some(max_charts) = max_charts.filter(|&m| m > 0) {
        if specs.len() > max_charts {
            log::warn!("Keeping the first {} of {} charts", max_charts, specs.len());
            specs.truncate(max_charts);
        }
    }
    specs
}

fn read_specs(path: &Path) -> Result<Vec<ChartSpec>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid chart specs in {}", path.display()))
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

/// `NN_<name>_chart.png`, numbered from 1.
fn numbered_png_name(number: usize, spec: &ChartSpec) -> String {
    format!("{:02}_{}", number, spec.png_file_name())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        let zip = [0x50, 0x4B, 0x03, 0x04, 0, 0, 0, 0];
        let ole = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

        assert_eq!(
            detect_format(&zip, Path::new("data.bin")).unwrap(),
            SpreadsheetFormat::Xlsx
        );
        assert_eq!(
            detect_format(&ole, Path::new("data.xlsx")).unwrap(),
            SpreadsheetFormat::Xls
        );
        assert_eq!(
            detect_format(b"", Path::new("data.XLS")).unwrap(),
            SpreadsheetFormat::Xls
        );
        assert!(detect_format(b"plain text", Path::new("data.csv")).is_err());
    }

    #[test]
    fn test_numbered_png_name() {
        let spec = ChartSpec::bar("Region", "Sales");
        assert_eq!(numbered_png_name(3, &spec), "03_Region_Sales_chart.png");
    }

    #[test]
    fn test_limit_specs() {
        let specs = vec![
            ChartSpec::histogram("A"),
            ChartSpec::histogram("B"),
            ChartSpec::histogram("C"),
        ];
        assert_eq!(limit(specs.clone(), Some(2)).len(), 2);
        assert_eq!(limit(specs.clone(), Some(0)).len(), 3);
        assert_eq!(limit(specs, None).len(), 3);
    }

    #[test]
    fn test_parse_chart_command() {
        let cli = Cli::try_parse_from([
            "chartdeck", "chart", "sales.xlsx", "--kind", "bar-chart", "--x", "Region", "--y",
            "Sales", "Units", "--color", "Year",
        ])
        .unwrap();

        match cli.command {
            Command::Chart {
                kind, x, y, color, ..
            } => {
                assert_eq!(kind, ChartKind::Bar);
                assert_eq!(x, "Region");
                assert_eq!(y, vec!["Sales", "Units"]);
                assert_eq!(color.as_deref(), Some("Year"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_oversized_image_is_rejected() {
        let result = Cli::try_parse_from(["chartdeck", "png", "sales.xlsx", "--width", "100000"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from(["chartdeck", "png", "sales.xlsx", "--height", "8192"]).unwrap();
        match cli.command {
            Command::Png { size, .. } => assert_eq!(size.renderer().size(), (960, 8192)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_export_defaults() {
        let cli = Cli::try_parse_from(["chartdeck", "-v", "export", "sales.xls"]).unwrap();
        assert!(cli.verbose);

        match cli.command {
            Command::Export {
                prefix,
                label,
                unique,
                size,
                ..
            } => {
                assert_eq!(prefix, "Chart_Deck");
                assert_eq!(label, "Chart_Analysis");
                assert!(!unique);
                assert_eq!((size.width, size.height), (960, 720));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
