use crate::cli::LayoutArgs;
use anyhow::{Context, Result};
use std::path::Path;
use tome_text::TextDocument;
use tome_text_transform::{Composer, LayoutConfig, LineElement};

/// Config file picked up from the working directory.
const DISCOVERED_CONFIG: &str = "tome.toml";

pub fn run(args: &LayoutArgs) -> Result<String> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let discovered = Path::new(DISCOVERED_CONFIG);
    let mut config = LayoutConfig::load_with_overrides(
        args.config.as_deref(),
        discovered.exists().then_some(discovered),
    )?;
    if let Some(width) = args.width {
        config.characters_per_line = width;
    }
    if let Some(wrap) = args.wrap {
        config.wrap_mode = wrap;
    }
    if let Some(tab_width) = args.tab_width {
        config.tab_width = tab_width;
    }
    config.validate()?;

    let mut document = TextDocument::from_text(&text);
    let mut composer = Composer::new(&document, config);
    for &(begin, end) in &args.folds {
        composer
            .add_fold(&mut document, begin, end)
            .with_context(|| format!("Failed to fold {begin}-{end}"))?;
    }
    tracing::info!(
        "laid out {} blocks into {} lines",
        document.line_count(),
        composer.height()
    );

    let output = render(&composer, &document, args.numbers);
    composer.release(&mut document)?;
    Ok(output)
}

fn render(composer: &Composer, document: &TextDocument, numbers: bool) -> String {
    let mut output = String::new();
    for (index, line) in composer.lines().iter().enumerate() {
        let text = composer.render_line(document, index).unwrap_or_default();
        if numbers {
            let starts_block = line.wrap_index == 0
                || matches!(line.elements.first(), Some(LineElement::BlockFragment { start_column: 0, .. }));
            match document.line_of(line.root) {
                Some(number) if starts_block && !line.is_continuation() => {
                    output.push_str(&format!("{:>4} ", number + 1))
                },
                _ => output.push_str("     "),
            }
        }
        output.push_str(text.trim_end());
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use tome_text::Position;
    use tome_text_transform::WrapMode;

    fn args(file: &Path) -> LayoutArgs {
        LayoutArgs {
            file: file.to_path_buf(),
            config: None,
            width: None,
            wrap: None,
            tab_width: None,
            folds: Vec::new(),
            numbers: false,
        }
    }

    #[test]
    fn lays_out_a_file() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let file = tmp_dir.path().join("doc.txt");
        std::fs::write(&file, "This is a simple document.\nIt spans over 2 lines.").unwrap();

        let mut layout = args(&file);
        layout.width = Some(12);
        layout.wrap = Some(WrapMode::Word);
        assert_eq!(
            run(&layout).unwrap(),
            "This is a\nsimple\ndocument.\nIt spans\nover 2\nlines.\n"
        );

        layout.wrap = Some(WrapMode::NoWrap);
        layout.folds = vec![(Position::new(0, 5), Position::new(1, 6))];
        assert_eq!(run(&layout).unwrap(), "This ...ns over 2 lines.\n");
    }

    #[test]
    fn numbers_mark_block_starts() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let file = tmp_dir.path().join("doc.txt");
        std::fs::write(&file, "aaaa bbbb\ncc").unwrap();

        let mut layout = args(&file);
        layout.width = Some(5);
        layout.numbers = true;
        assert_eq!(run(&layout).unwrap(), "   1 aaaa\n     bbbb\n   2 cc\n");
    }

    #[test]
    fn config_file_is_applied() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let file = tmp_dir.path().join("doc.txt");
        let config = tmp_dir.path().join("layout.toml");
        std::fs::write(&file, "\tx").unwrap();
        std::fs::write(&config, "tab_width = 2\n").unwrap();

        let mut layout = args(&file);
        layout.config = Some(config);
        assert_eq!(run(&layout).unwrap(), "  x\n");
    }

    #[test]
    fn zero_tab_width_is_rejected() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let file = tmp_dir.path().join("doc.txt");
        std::fs::write(&file, "\tx").unwrap();

        let mut layout = args(&file);
        layout.tab_width = Some(0);
        let error = run(&layout).unwrap_err();
        assert!(error.to_string().contains("tab_width must be at least 1"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let result = run(&args(&tmp_dir.path().join("missing.txt")));
        assert!(result.unwrap_err().to_string().contains("Failed to read"));
    }
}
