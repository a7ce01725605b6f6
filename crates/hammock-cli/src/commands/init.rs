//! The `hammock init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create hammock.toml
    if std::path::Path::new("hammock.toml").exists() {
        println!("hammock.toml already exists, skipping.");
    } else {
        std::fs::write("hammock.toml", SAMPLE_CONFIG)?;
        println!("Created hammock.toml");
    }

    // Create example question
    std::fs::create_dir_all("questions")?;
    let example_path = std::path::Path::new("questions/example.json");
    if example_path.exists() {
        println!("questions/example.json already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUESTION)?;
        println!("Created questions/example.json");
    }

    println!("\nNext steps:");
    println!("  1. Run: hammock validate --question questions/example.json");
    println!("  2. Run: hammock grade --question questions/example.json --responses paris,-");
    println!("  3. Run: hammock simulate --script \"submit paris,-; submit paris,4\"");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# hammock configuration

content_dir = "questions"
question_asset = "example.json"

# Emit one telemetry record per graded part on submit
telemetry = true
action_kind = "EVALUATE_QUESTION"
mime_type = "application/json"
"#;

const EXAMPLE_QUESTION: &str = r#"{
  "prompt": "A short warm-up",
  "hints": ["Both answers are one word or one number"],
  "parts": [
    {
      "prompt": "What is the capital of France?",
      "match": {
        "paris": [true, "Correct, {{key}} it is."],
        "lyon": [false, "{{ key }} is large, but not the capital."]
      }
    },
    {
      "prompt": "What is 2 + 2?",
      "score": 2,
      "match": {
        "4": [2, "Right."],
        "5": [0, "Check the arithmetic; you answered {{value}}."]
      }
    }
  ]
}
"#;
