use doolittle::{AttemptSummary, SelectionSummary, TurnDetails, TurnOutcome};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_turn(input: &str, details: &TurnDetails, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Turn: \"{}\"", input), ansi::CYAN)));
    println!("{}", palette.dim(format!("   sentence: \"{}\"", details.sentence)));

    // Keyword ranking
    println!("\n{}", palette.paint("━━━ Keywords ━━━", ansi::GRAY));
    if details.ranked.is_empty() {
        println!("{}", palette.dim("  No keywords found in the input"));
    }
    for (idx, ranked) in details.ranked.iter().enumerate() {
        println!(
            "  {} {} {}",
            palette.paint(format!("[{}]", idx), ansi::GRAY),
            palette.bold(palette.paint(&ranked.keyword, ansi::BLUE)),
            palette.dim(format!("weight {}", ranked.weight)),
        );
    }

    // Attempts, in the order tried
    println!("\n{}", palette.paint("━━━ Attempts ━━━", ansi::GRAY));
    if details.attempts.is_empty() {
        println!("{}", palette.dim("  No keywords tried"));
    }
    for attempt in &details.attempts {
        print_attempt(attempt, &palette);
    }

    println!("\n{}", palette.paint("━━━ Outcome ━━━", ansi::GRAY));
    match &details.outcome {
        TurnOutcome::Answered { keyword } => {
            println!("  {}", palette.paint(format!("✓ answered via '{}'", keyword), ansi::GREEN));
        }
        TurnOutcome::Fallback => {
            println!("  {}", palette.paint("✗ no keyword answered, fallback rule used", ansi::YELLOW));
            println!("\n{}", palette.dim("  Tip: Set DOOLITTLE_DEBUG_RULES=1 to see match traces"));
        }
        TurnOutcome::RedirectLimit { keyword } => {
            let text = format!("✗ redirect chain through '{}' hit the hop ceiling, fallback rule used", keyword);
            println!("  {}", palette.paint(text, ansi::YELLOW));
        }
    }

    // Timing
    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Normalize: {}  │  Search: {}",
        palette.paint(format!("{:?}", details.total), ansi::GREEN),
        palette.dim(format!("{:?}", details.normalize)),
        palette.paint(format!("{:?}", details.search), ansi::CYAN),
    );
    println!();
}

fn print_attempt(attempt: &AttemptSummary, palette: &ansi::Palette) {
    let mut heading = palette.bold(palette.paint(&attempt.keyword, ansi::BLUE));
    if attempt.via_redirect {
        heading.push(' ');
        heading.push_str(&palette.dim("(via goto)"));
    }
    println!("  {heading}");

    match &attempt.pattern {
        Some(pattern) => {
            println!("    {} {}", palette.dim("│ matched"), palette.paint(format!("\"{}\"", pattern), ansi::CYAN));
            if let Some(synonym) = &attempt.synonym {
                println!("    {} {}", palette.dim("│ synonym"), palette.paint(synonym, ansi::YELLOW));
            }
            if !attempt.captures.is_empty() {
                println!("    {} {}", palette.dim("│ captures"), palette.dim(format!("{:?}", attempt.captures)));
            }
        }
        None => println!("    {}", palette.dim("│ no decomposition matched")),
    }

    match &attempt.selected {
        Some(SelectionSummary::Template { index }) => {
            println!("    {} {}", palette.dim("│ reasmb"), palette.paint(format!("#{}", index + 1), ansi::GREEN));
        }
        Some(SelectionSummary::Redirect { target }) => {
            println!("    {} {}", palette.dim("│ goto"), palette.paint(target, ansi::YELLOW));
        }
        None => {}
    }
}
