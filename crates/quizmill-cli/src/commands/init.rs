//! The `quizmill init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("quizmill.toml").exists() {
        println!("quizmill.toml already exists, skipping.");
    } else {
        std::fs::write("quizmill.toml", SAMPLE_CONFIG)?;
        println!("Created quizmill.toml");
    }

    std::fs::create_dir_all("samples")?;
    for (path, content) in [
        ("samples/questions.json", SAMPLE_QUESTIONS),
        ("samples/answers.json", SAMPLE_ANSWERS),
    ] {
        if std::path::Path::new(path).exists() {
            println!("{path} already exists, skipping.");
        } else {
            std::fs::write(path, content)?;
            println!("Created {path}");
        }
    }

    println!("\nNext steps:");
    println!("  1. Edit quizmill.toml with your backend URL and user id");
    println!("  2. Run: quizmill validate --questions samples/questions.json");
    println!("  3. Run: quizmill run --course \"Marketing\" --answers samples/answers.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizmill configuration

default_level = "L3"
output_dir = "./quizmill-reports"

[backend]
type = "rest"
base_url = "${QUIZMILL_BASE_URL}"
user_id = "${QUIZMILL_USER_ID}"
generated = false

# For offline runs against a built-in sample course:
# [backend]
# type = "mock"
"#;

const SAMPLE_QUESTIONS: &str = r#"[
  ["What is 2+2?", "4", "3", "5", "Aucune de ces réponses."],
  ["Capital of France?", "Paris", "Lyon", "Marseille"]
]
"#;

const SAMPLE_ANSWERS: &str = r#"[
  "4",
  "Paris"
]
"#;
