//! The `aptitude init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("aptitude.toml").exists() {
        println!("aptitude.toml already exists, skipping.");
    } else {
        std::fs::write("aptitude.toml", SAMPLE_CONFIG)?;
        println!("Created aptitude.toml");
    }

    std::fs::create_dir_all("catalog")?;
    let sample_path = std::path::Path::new("catalog/sample.toml");
    if sample_path.exists() {
        println!("catalog/sample.toml already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_CATALOG)?;
        println!("Created catalog/sample.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: aptitude validate --catalog catalog/sample.toml");
    println!("  2. Run: aptitude import --catalog catalog/sample.toml");
    println!("  3. Run: aptitude assign --candidate cand-1");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# aptitude configuration

data_dir = "./aptitude-data"
# seed = 42

[category_groups]
fallback = "other"

[category_groups.groups]
java = "technical"
database = "technical"
problem_solving = "problem_solving"
"#;

const SAMPLE_CATALOG: &str = r#"[[departments]]
id = "dept_backend"
name = "Backend"

[[questions]]
id = "java-001"
category = "java"
type = "objective"
difficulty = "easy"
prompt = "Which keyword declares a local variable with inferred type?"
points = 5
department_ids = ["dept_backend"]
options = ["var", "let", "auto"]
correct_answer = "var"

[[questions]]
id = "java-002"
category = "java"
type = "subjective"
prompt = "How does an interface differ from an abstract class?"
points = 10
department_ids = ["dept_backend"]
keywords = ["interface", "abstract", "implement"]

[[questions]]
id = "db-001"
category = "database"
type = "subjective"
difficulty = "hard"
prompt = "Write a query returning users older than 30."
points = 10
department_ids = ["dept_backend"]
keywords = ["select", "from", "where"]
reference_answer = "SELECT * FROM users WHERE age > 30"

[[questions]]
id = "ps-001"
category = "problem_solving"
type = "objective"
prompt = "What is 6 times 7?"
points = 5
department_ids = ["dept_backend"]
options = ["36", "42", "48"]
correct_answer = "42"

[[quota]]
category = "java"
answer_type = "objective"
count = 1

[[quota]]
category = "java"
answer_type = "subjective"
count = 1

[[quota]]
category = "database"
answer_type = "subjective"
count = 1

[[quota]]
category = "problem_solving"
answer_type = "objective"
count = 1

[[candidates]]
id = "cand-1"
name = "Kim"
email = "kim@example.com"
department_id = "dept_backend"

[[candidates]]
id = "cand-2"
name = "Lee"
department_id = "dept_backend"
"#;
