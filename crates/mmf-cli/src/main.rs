//! Command line front end: convert a MERRILL Tecplot file to a VTK
//! container, optionally with a ParaView temporal descriptor and a JSON
//! summary document.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use mmf_io::{PvdWriter, VtuWriter};
use mmf_model::ModelSummary;

fn usage() {
    eprintln!(
        "usage: mmf-cli <input.tec> <output.vtu> [<output.pvd>] [--summary <summary.json>]"
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    input: PathBuf,
    container: PathBuf,
    descriptor: Option<PathBuf>,
    summary: Option<PathBuf>,
}

fn parse_args(raw: &[String]) -> Result<CliArgs, String> {
    let mut positional = Vec::<PathBuf>::new();
    let mut summary = None;

    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--summary" => {
                let Some(path) = iter.next() else {
                    return Err("--summary requires a file path".to_string());
                };
                summary = Some(PathBuf::from(path));
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown option: {other}"));
            }
            other => positional.push(PathBuf::from(other)),
        }
    }

    let mut positional = positional.into_iter();
    match (positional.next(), positional.next(), positional.next(), positional.next()) {
        (Some(input), Some(container), descriptor, None) => Ok(CliArgs {
            input,
            container,
            descriptor,
            summary,
        }),
        _ => Err("expected an input path and one or two output paths".to_string()),
    }
}

fn main() -> ExitCode {
    let raw: Vec<String> = std::env::args().skip(1).collect();

    if raw.iter().any(|arg| arg == "-h" || arg == "--help") {
        usage();
        return ExitCode::SUCCESS;
    }

    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            usage();
            return ExitCode::from(1);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(args: &CliArgs) -> mmf_io::Result<()> {
    println!("Input file: {}", args.input.display());
    println!("Output container file: {}", args.container.display());
    if let Some(descriptor) = &args.descriptor {
        println!("Output descriptor file: {}", descriptor.display());
    }

    let started = Instant::now();

    let model = mmf_io::parse_file(&args.input)?;
    let summary = ModelSummary::from_model(&model);

    VtuWriter::new(&model).write_file(&args.container)?;

    if let Some(descriptor) = &args.descriptor {
        // The descriptor references the container relative to its own
        // directory, so use the bare file name when one exists.
        let container_ref = args
            .container
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.container.display().to_string());
        PvdWriter::new(&model, &container_ref).write_file(descriptor)?;
    }

    print_summary(&summary, started.elapsed());

    if let Some(path) = &args.summary {
        write_summary_json(path, args, &summary)?;
    }

    Ok(())
}

fn print_summary(summary: &ModelSummary, elapsed: Duration) {
    println!("n_vertices: {}", summary.n_vertices);
    println!("n_elements: {}", summary.n_elements);
    println!("n_submeshes: {}", summary.n_submeshes());
    println!("n_fields: {}", summary.n_fields);
    println!("processing_time_ms: {}", elapsed.as_millis());
}

fn write_summary_json(
    path: &Path,
    args: &CliArgs,
    summary: &ModelSummary,
) -> mmf_io::Result<()> {
    let document = serde_json::json!({
        "created": chrono::Local::now().to_rfc3339(),
        "input": args.input.display().to_string(),
        "container": args.container.display().to_string(),
        "descriptor": args.descriptor.as_ref().map(|p| p.display().to_string()),
        "summary": summary,
    });

    let bytes = serde_json::to_vec_pretty(&document)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_two_positional_paths() {
        let args = parse_args(&strings(&["in.tec", "out.vtu"])).expect("two paths are enough");
        assert_eq!(args.input, PathBuf::from("in.tec"));
        assert_eq!(args.container, PathBuf::from("out.vtu"));
        assert_eq!(args.descriptor, None);
        assert_eq!(args.summary, None);
    }

    #[test]
    fn parses_descriptor_and_summary() {
        let args = parse_args(&strings(&[
            "in.tec",
            "out.vtu",
            "out.pvd",
            "--summary",
            "report.json",
        ]))
        .expect("full argument set should parse");
        assert_eq!(args.descriptor, Some(PathBuf::from("out.pvd")));
        assert_eq!(args.summary, Some(PathBuf::from("report.json")));
    }

    #[test]
    fn rejects_missing_or_excess_paths() {
        assert!(parse_args(&strings(&["in.tec"])).is_err());
        assert!(parse_args(&strings(&["a", "b", "c", "d"])).is_err());
    }

    #[test]
    fn rejects_unknown_options_and_dangling_summary() {
        assert!(parse_args(&strings(&["in.tec", "out.vtu", "--fast"])).is_err());
        assert!(parse_args(&strings(&["in.tec", "out.vtu", "--summary"])).is_err());
    }
}
