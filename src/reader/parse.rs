use crate::reader::record::Record;
use crate::literal::{Literal, parse_literal, parse_literal_pair};
use anyhow::{Context, bail};
use std::fs;

/// Read one record log.
///
/// Two layouts are accepted, told apart by the first non-empty line:
///
/// - one `<key> <value>` assignment per line, the whole file being one run:
///
///   ```text
///   'application' 'Montage'
///   'size' '30'
///   'makespan' 1234.000000
///   ```
///
/// - one dictionary per line, each line being one run:
///
///   ```text
///   {'application': 'Montage', 'size': 30, 'makespan': 1234.0}
///   ```
pub fn read_record_file(path: &str) -> anyhow::Result<Vec<Record>> {
    let text = fs::read_to_string(path).with_context(|| format!("read record log {}", path))?;
    let records = parse_records(&text, path)?;
    log::debug!("{}: {} record(s)", path, records.len());
    Ok(records)
}

/// Read every file in order and concatenate their records.
pub fn read_record_files(paths: &[String]) -> anyhow::Result<Vec<Record>> {
    let mut out = Vec::new();
    for path in paths {
        out.extend(read_record_file(path)?);
    }
    Ok(out)
}

/// Parse record log text; `origin` only labels error messages.
pub fn parse_records(text: &str, origin: &str) -> anyhow::Result<Vec<Record>> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(lineno, line)| (lineno + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .peekable();

    let dict_per_line = matches!(
        lines.peek().map(|(_, line)| parse_literal(line)),
        Some(Ok(Literal::Dict(_)))
    );

    if dict_per_line {
        let mut out = Vec::new();
        for (lno, line) in lines {
            let entries = match parse_literal(line)
                .with_context(|| format!("record log parse error at {}:{}", origin, lno))?
            {
                Literal::Dict(entries) => entries,
                other => bail!(
                    "record log parse error at {}:{}: expected a dictionary, found {} {}",
                    origin,
                    lno,
                    other.type_name(),
                    other
                ),
            };
            let mut record = Record::default();
            for (key, value) in &entries {
                record
                    .set(key, value)
                    .with_context(|| format!("bad record at {}:{}", origin, lno))?;
            }
            out.push(record);
        }
        return Ok(out);
    }

    let mut record = Record::default();
    let mut assignments = 0usize;
    for (lno, line) in lines {
        let (key, value) = parse_literal_pair(line)
            .with_context(|| format!("record log parse error at {}:{}", origin, lno))?;
        record
            .set(&key, &value)
            .with_context(|| format!("bad record at {}:{}", origin, lno))?;
        assignments += 1;
    }

    if assignments == 0 {
        return Ok(Vec::new());
    }
    Ok(vec![record])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SLR_PLOT_DATA: &str = "'application' 'Montage'
'size' '30'
'optimalMakespan' 100.000000
'makespan' 150.000000
'powerDipFraction' 0.500000
";

    #[test]
    fn key_value_file_is_one_record() {
        let records = parse_records(SLR_PLOT_DATA, "slr_plot_data").unwrap();
        assert_eq!(
            records,
            vec![Record {
                application: Some("Montage".into()),
                algorithm_name: None,
                power_dip_fraction: Some(0.5),
                size: Some(30.0),
                makespan: Some(150.0),
                optimal_makespan: Some(100.0),
            }]
        );
    }

    #[test]
    fn dictionary_lines_are_one_record_each() {
        let text = "{'application': 'Montage', 'algorithmName': 'HEFT', 'size': 10, 'makespan': 5.0}

{'application': 'Montage', 'algorithmName': 'FCFS', 'size': 10, 'makespan': 7.5,}
";
        let records = parse_records(text, "runs.log").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].algorithm_name.as_deref(), Some("HEFT"));
        assert_eq!(records[1].makespan, Some(7.5));
    }

    #[test]
    fn empty_text_has_no_records() {
        assert_eq!(parse_records("", "empty").unwrap(), vec![]);
        assert_eq!(parse_records("\n  \n", "blank").unwrap(), vec![]);
    }

    #[test]
    fn errors_name_file_and_line() {
        let text = "'application' 'Montage'\n'size' 30 40\n";
        let err = parse_records(text, "runs/a").unwrap_err();
        assert_eq!(err.to_string(), "record log parse error at runs/a:2");

        let text = "'application' 'Montage'\n'makspan' 30\n";
        let err = parse_records(text, "runs/b").unwrap_err();
        assert_eq!(err.to_string(), "bad record at runs/b:2");
        assert!(format!("{:#}", err).contains("unknown record field"));

        let text = "{'size': 1}\n('size', 2)\n";
        let err = parse_records(text, "runs/c").unwrap_err();
        assert!(err.to_string().contains("runs/c:2: expected a dictionary"));
    }

    #[test]
    fn arbitrary_code_is_never_run() {
        let text = "__import__('os').system('true') 1\n";
        let err = parse_records(text, "evil").unwrap_err();
        assert!(format!("{:#}", err).contains("unknown name \"__import__\""));
    }

    #[test]
    fn reads_files_in_argument_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (i, app) in ["Montage", "Sipht"].iter().enumerate() {
            let path = dir.path().join(format!("run{}", i));
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "'application' '{}'", app).unwrap();
            writeln!(f, "'size' '{}'", 10 * (i + 1)).unwrap();
            paths.push(path.to_string_lossy().into_owned());
        }

        let records = read_record_files(&paths).unwrap();
        let apps: Vec<_> = records
            .iter()
            .map(|r| r.application.clone().unwrap())
            .collect();
        assert_eq!(apps, vec!["Montage", "Sipht"]);
        assert_eq!(records[1].size, Some(20.0));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_record_file("/nonexistent/slr_plot_data").unwrap_err();
        assert!(err.to_string().starts_with("read record log"));
    }
}
