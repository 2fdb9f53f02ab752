use crate::ai::QuizEntry;
use crate::plan::schedule::Item;

/// Generated study blocks for one item of a day. `None` means the upstream
/// source was missing or failed; rendering falls back to an explicit
/// placeholder for that block.
#[derive(Debug, Clone, Default)]
pub struct ItemMaterial {
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub quiz: Option<Vec<QuizEntry>>,
}

/// Duration in hours, rounded to two decimals.
pub fn duration_hours(length_seconds: u64) -> f64 {
    (length_seconds as f64 / 3600.0 * 100.0).round() / 100.0
}

/// Render the study document for one day: a title block, the day's item
/// list with duration in hours, then per item a transcript block, a summary
/// block and a Q&A block.
pub fn render_day_material(day: u32, items: &[Item], materials: &[ItemMaterial]) -> String {
    let mut doc = format!("# Daily Study Material - Day {day}\n\n## Videos for Today\n\n");
    for (idx, item) in items.iter().enumerate() {
        doc.push_str(&format!(
            "{}. {} ({:.2} hours)\n",
            idx + 1,
            item.title,
            duration_hours(item.length)
        ));
    }
    for (idx, item) in items.iter().enumerate() {
        let empty = ItemMaterial::default();
        let material = materials.get(idx).unwrap_or(&empty);
        doc.push_str(&format!("\n## Video {}: {}\n\n", idx + 1, item.title));
        doc.push_str("### Transcript\n\n");
        doc.push_str(material.transcript.as_deref().unwrap_or("Transcript not available"));
        doc.push_str("\n\n### Summary\n\n");
        doc.push_str(material.summary.as_deref().unwrap_or("Summary not available"));
        doc.push_str("\n\n### Questions & Answers\n\n");
        match &material.quiz {
            Some(quiz) if !quiz.is_empty() => {
                for entry in quiz {
                    doc.push_str(&format!("**Q:** {}\n\n**A:** {}\n\n", entry.question, entry.answer));
                }
            }
            _ => doc.push_str("Q&A not available\n"),
        }
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, length: u64) -> Item {
        Item {
            title: title.to_string(),
            length,
            url: "https://youtu.be/vid".to_string(),
        }
    }

    #[test]
    fn hours_round_to_two_decimals() {
        assert_eq!(duration_hours(4500), 1.25);
        assert_eq!(duration_hours(3600), 1.0);
        assert_eq!(duration_hours(1000), 0.28);
        assert_eq!(duration_hours(0), 0.0);
    }

    #[test]
    fn renders_all_blocks_in_order() {
        let items = vec![item("Intro", 4500)];
        let materials = vec![ItemMaterial {
            transcript: Some("hello world".to_string()),
            summary: Some("a greeting".to_string()),
            quiz: Some(vec![QuizEntry {
                question: "What is said?".to_string(),
                answer: "Hello".to_string(),
            }]),
        }];
        let doc = render_day_material(2, &items, &materials);

        assert!(doc.starts_with("# Daily Study Material - Day 2"));
        assert!(doc.contains("1. Intro (1.25 hours)"));
        let transcript_at = doc.find("hello world").unwrap();
        let summary_at = doc.find("a greeting").unwrap();
        let quiz_at = doc.find("What is said?").unwrap();
        assert!(transcript_at < summary_at && summary_at < quiz_at);
    }

    #[test]
    fn missing_sources_fall_back_to_placeholders() {
        let items = vec![item("Silent video", 60)];
        let doc = render_day_material(1, &items, &[ItemMaterial::default()]);
        assert!(doc.contains("Transcript not available"));
        assert!(doc.contains("Summary not available"));
        assert!(doc.contains("Q&A not available"));
    }

    #[test]
    fn each_item_gets_its_own_section() {
        let items = vec![item("First", 60), item("Second", 120)];
        let doc = render_day_material(1, &items, &[]);
        assert!(doc.contains("## Video 1: First"));
        assert!(doc.contains("## Video 2: Second"));
    }
}
