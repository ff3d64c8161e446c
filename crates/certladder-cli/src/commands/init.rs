//! The `certladder init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create certladder.toml
    if std::path::Path::new("certladder.toml").exists() {
        println!("certladder.toml already exists, skipping.");
    } else {
        std::fs::write("certladder.toml", SAMPLE_CONFIG)?;
        println!("Created certladder.toml");
    }

    // Create example question bank
    std::fs::create_dir_all("banks")?;
    let example_path = std::path::Path::new("banks/example-step1.toml");
    if example_path.exists() {
        println!("banks/example-step1.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created banks/example-step1.toml");
    }

    println!("\nNext steps:");
    println!("  1. Add questions until each level has 22 (see `certladder table`)");
    println!("  2. Run: certladder validate --bank banks/");
    println!("  3. Run: certladder replay --bank banks/example-step1.toml --answers 0,1,2,1");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# certladder configuration

# keep_highest never lowers a certified level; unconditional applies
# every recommendation as-is.
level_policy = "keep_highest"
question_bank = "banks"

# Minutes allowed per step.
[time_limits]
step_1 = 44
step_2 = 44
step_3 = 44

[results]
type = "jsonl"
path = "results/attempts.jsonl"
"#;

const EXAMPLE_BANK: &str = r#"[bank]
id = "example-step1"
name = "Example Step 1 Bank"
description = "Foundation questions for levels A1 and A2"
step = 1

[[questions]]
id = "inf-a1-1"
level = "A1"
competency = "INF"
prompt = "Which tool is designed for finding pages on the web?"
options = ["A search engine", "A spreadsheet", "A file archiver"]
correct_answer = 0
explanation = "Search engines index web pages so they can be found by keyword."

[[questions]]
id = "com-a1-1"
level = "A1"
competency = "COM"
prompt = "Which field of an email holds the recipient's address?"
options = ["Subject", "To", "Signature"]
correct_answer = 1

[[questions]]
id = "saf-a2-1"
level = "A2"
competency = "SAF"
prompt = "Which of these passwords is the strongest?"
options = ["password123", "your birth date", "T7#q!m2Lz9&w"]
correct_answer = 2
explanation = "Long passwords mixing letters, digits and symbols are hardest to guess."

[[questions]]
id = "pro-a2-1"
level = "A2"
competency = "PRO"
prompt = "A message urges you to click a link to 'verify your bank account'. What should you do?"
options = [
    "Click the link and log in quickly",
    "Contact the bank through its official website or phone number",
    "Forward it to your contacts as a warning",
]
correct_answer = 1
"#;
