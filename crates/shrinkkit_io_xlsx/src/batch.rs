//! Directory batch conversion: every matching workbook to wire JSON.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::error::BatchError;
use crate::facade::to_json;
use crate::report::{ReportBatch, ReportBatchBuilder};
use crate::spec::SpecBatchOptions;
use crate::util::calculate_worker_limit;

#[derive(Debug, Clone)]
struct SpecConvertTask {
    path_file_src: PathBuf,
    path_file_dst: PathBuf,
}

/// Convert every file in `dir_source` whose name matches the pattern.
///
/// Only the top level of `dir_source` is scanned. Each match is written to
/// `<stem>.<suffix_out>` in `dir_destination`. A failing file is recorded in
/// the report and never stops the batch.
pub fn batch_to_json<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_batch_options: &SpecBatchOptions,
) -> Result<ReportBatch, BatchError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dir_src = dir_source.as_ref().to_path_buf();
    let path_dir_dst = dir_destination.as_ref().to_path_buf();

    if !path_dir_src.is_dir() {
        return Err(BatchError::SourceNotDirectory(path_dir_src));
    }
    let matcher = compile_pattern(&spec_batch_options.pattern)?;
    fs::create_dir_all(&path_dir_dst).map_err(|e| BatchError::DestinationInitFailed {
        path: path_dir_dst.clone(),
        message: e.to_string(),
    })?;

    let mut builder_batch_report = ReportBatchBuilder::default();
    let l_tasks = collect_convert_tasks(
        &path_dir_src,
        &path_dir_dst,
        &matcher,
        &spec_batch_options.suffix_out,
        &mut builder_batch_report,
    );
    let n_workers_max = calculate_worker_limit(spec_batch_options.num_workers_max);
    log::debug!(
        "Batch: {} task(s) from {} on up to {n_workers_max} worker(s).",
        l_tasks.len(),
        path_dir_src.display()
    );

    run_convert_tasks(
        l_tasks,
        spec_batch_options,
        n_workers_max,
        &mut builder_batch_report,
    );
    let report = builder_batch_report.build();
    log::info!("{report}");
    Ok(report)
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher, BatchError> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| BatchError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

fn collect_convert_tasks(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    matcher: &GlobMatcher,
    suffix_out: &str,
    builder_batch_report: &mut ReportBatchBuilder,
) -> Vec<SpecConvertTask> {
    let iter_entries = match fs::read_dir(path_dir_src) {
        Ok(val) => val,
        Err(e) => {
            builder_batch_report.add_error(path_dir_src.to_path_buf(), e.to_string());
            return Vec::new();
        }
    };

    let mut l_tasks = Vec::new();
    for entry in iter_entries {
        let entry = match entry {
            Ok(val) => val,
            Err(e) => {
                builder_batch_report.add_error(path_dir_src.to_path_buf(), e.to_string());
                continue;
            }
        };
        builder_batch_report.add_scanned();

        let path_file_src = entry.path();
        if !path_file_src.is_file() {
            continue;
        }
        let name_file = entry.file_name().to_string_lossy().into_owned();
        if !matcher.is_match(&name_file) {
            continue;
        }
        // Office lock files share the pattern but are never workbooks.
        if name_file.starts_with("~$") {
            builder_batch_report.add_warning(format!("Skipped lock file: {name_file}"));
            continue;
        }
        builder_batch_report.add_matched();

        let Some(stem) = path_file_src.file_stem() else {
            continue;
        };
        let path_file_dst = path_dir_dst.join(format!(
            "{}.{}",
            stem.to_string_lossy(),
            suffix_out.trim_start_matches('.')
        ));
        l_tasks.push(SpecConvertTask {
            path_file_src,
            path_file_dst,
        });
    }
    l_tasks.sort_by(|a, b| a.path_file_src.cmp(&b.path_file_src));
    l_tasks
}

fn run_convert_task(
    spec_task: &SpecConvertTask,
    spec_batch_options: &SpecBatchOptions,
) -> Result<usize, String> {
    to_json(
        &spec_task.path_file_src,
        &spec_task.path_file_dst,
        &spec_batch_options.capture_options,
        &spec_batch_options.encode_options,
    )
    .map(|report| report.diagnostic_count())
    .map_err(|e| e.to_string())
}

fn run_convert_tasks(
    l_tasks: Vec<SpecConvertTask>,
    spec_batch_options: &SpecBatchOptions,
    n_workers_max: usize,
    builder_batch_report: &mut ReportBatchBuilder,
) {
    if l_tasks.is_empty() {
        return;
    }

    let apply_results = |l_results: Vec<(PathBuf, Result<usize, String>)>,
                         builder_batch_report: &mut ReportBatchBuilder| {
        for (path_file_src, res_convert) in l_results {
            match res_convert {
                Ok(cnt_diagnostics) => builder_batch_report.add_converted(cnt_diagnostics),
                Err(msg) => builder_batch_report.add_error(path_file_src, msg),
            }
        }
    };
    let run_serial = |l_tasks: Vec<SpecConvertTask>| {
        l_tasks
            .into_iter()
            .map(|spec_task| {
                let res_convert = run_convert_task(&spec_task, spec_batch_options);
                (spec_task.path_file_src, res_convert)
            })
            .collect::<Vec<_>>()
    };

    if n_workers_max <= 1 {
        apply_results(run_serial(l_tasks), builder_batch_report);
        return;
    }

    let thread_pool = ThreadPoolBuilder::new().num_threads(n_workers_max).build();
    let Ok(thread_pool) = thread_pool else {
        builder_batch_report.add_warning(format!(
            "Failed to initialize thread pool (workers={n_workers_max}); fallback to serial conversion."
        ));
        apply_results(run_serial(l_tasks), builder_batch_report);
        return;
    };

    let l_results = thread_pool.install(|| {
        l_tasks
            .into_par_iter()
            .map(|spec_task| {
                let res_convert = run_convert_task(&spec_task, spec_batch_options);
                (spec_task.path_file_src, res_convert)
            })
            .collect::<Vec<_>>()
    });
    apply_results(l_results, builder_batch_report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn write_workbook(path: &Path, value: &str) {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, value).expect("write cell");
        workbook.save(path).expect("save workbook");
    }

    #[test]
    fn batch_converts_matching_files_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("src");
        let dst = dir.path().join("out");
        fs::create_dir_all(&src).expect("src dir");
        write_workbook(&src.join("a.xlsx"), "alpha");
        write_workbook(&src.join("b.xlsx"), "beta");
        fs::write(src.join("notes.txt"), "not a workbook").expect("write txt");

        let options = SpecBatchOptions {
            num_workers_max: Some(2),
            ..Default::default()
        };
        let report = batch_to_json(&src, &dst, &options).expect("batch");
        assert_eq!(report.cnt_scanned, 3);
        assert_eq!(report.cnt_matched, 2);
        assert_eq!(report.cnt_converted, 2);
        assert_eq!(report.error_count(), 0);
        assert!(dst.join("a.json").is_file());
        assert!(dst.join("b.json").is_file());
    }

    #[test]
    fn batch_collects_per_file_failures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("src");
        fs::create_dir_all(&src).expect("src dir");
        write_workbook(&src.join("good.xlsx"), "ok");
        fs::write(src.join("broken.xlsx"), b"definitely not a zip").expect("write broken");

        let options = SpecBatchOptions {
            num_workers_max: Some(1),
            ..Default::default()
        };
        let report = batch_to_json(&src, dir.path().join("out"), &options).expect("batch");
        assert_eq!(report.cnt_matched, 2);
        assert_eq!(report.cnt_converted, 1);
        assert_eq!(report.error_count(), 1);
        assert!(report.errors[0].path.ends_with("broken.xlsx"));
    }

    #[test]
    fn batch_rejects_invalid_pattern_and_missing_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let options = SpecBatchOptions {
            pattern: "[".to_string(),
            ..Default::default()
        };
        let err = batch_to_json(dir.path(), dir.path().join("out"), &options)
            .err()
            .expect("must fail");
        assert!(matches!(err, BatchError::InvalidPattern { .. }));

        let err = batch_to_json(
            dir.path().join("missing"),
            dir.path().join("out"),
            &SpecBatchOptions::default(),
        )
        .err()
        .expect("must fail");
        assert!(matches!(err, BatchError::SourceNotDirectory(_)));
    }
}
