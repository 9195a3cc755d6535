//! Interactive card layout for alerts

use chrono::{DateTime, Local};
use serde_json::{json, Value};

use firewatch_core::{Alert, Tier};

/// Build the interactive card JSON for an alert
///
/// Layout: coloured header with the keyword and title, a time/details block,
/// the snapshot image when there is one, then a footer note naming the tier.
pub fn build_alert_card(alert: &Alert, keyword: &str, sent_at: DateTime<Local>) -> Value {
    let header_title = if keyword.is_empty() {
        alert.title.clone()
    } else {
        format!("🔥【{}】{}", keyword, alert.title)
    };

    let mut elements = vec![json!({
        "tag": "div",
        "text": {
            "tag": "lark_md",
            "content": format!(
                "**Time:** {}\n**Details:** {}",
                sent_at.format("%Y-%m-%d %H:%M:%S"),
                alert.body
            ),
        },
    })];

    if let Some(image) = &alert.image {
        elements.push(json!({
            "tag": "img",
            "img_key": image.0,
            "alt": { "tag": "plain_text", "content": "Scene snapshot" },
        }));
    }

    elements.push(json!({ "tag": "hr" }));
    elements.push(json!({
        "tag": "note",
        "elements": [{
            "tag": "plain_text",
            "content": footer(alert.tier),
        }],
    }));

    json!({
        "config": { "wide_screen_mode": true },
        "header": {
            "template": header_template(alert.tier),
            "title": { "tag": "plain_text", "content": header_title },
        },
        "elements": elements,
    })
}

fn header_template(tier: Tier) -> &'static str {
    match tier {
        Tier::Normal => "green",
        Tier::UrgentSms | Tier::UrgentPhone => "red",
    }
}

fn footer(tier: Tier) -> String {
    match tier {
        Tier::Normal => "Automatic notice from firewatch".to_string(),
        _ => format!(
            "Automatic alarm ({}). Reply \"1\" or \"收到\" to acknowledge.",
            tier.description()
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use firewatch_core::ImageKey;

    use super::*;

    fn alert(tier: Tier, image: Option<&str>) -> Alert {
        Alert {
            title: "Lab fire alarm".into(),
            body: "Open flame detected near bench 3".into(),
            image: image.map(|k| ImageKey(k.into())),
            tier,
        }
    }

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 1, 14, 5, 9).unwrap()
    }

    #[test]
    fn test_urgent_card_layout() {
        let card = build_alert_card(&alert(Tier::UrgentSms, None), "Fire alarm", at());

        assert_eq!(card["header"]["template"], "red");
        assert_eq!(
            card["header"]["title"]["content"],
            "🔥【Fire alarm】Lab fire alarm"
        );
        let text = card["elements"][0]["text"]["content"].as_str().unwrap();
        assert!(text.contains("2026-03-01 14:05:09"));
        assert!(text.contains("bench 3"));

        let tags: Vec<&str> = card["elements"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["tag"].as_str().unwrap())
            .collect();
        assert_eq!(tags, vec!["div", "hr", "note"]);
    }

    #[test]
    fn test_card_with_image() {
        let card = build_alert_card(&alert(Tier::UrgentPhone, Some("img_v2_x")), "", at());

        assert_eq!(card["header"]["title"]["content"], "Lab fire alarm");
        assert_eq!(card["elements"][1]["tag"], "img");
        assert_eq!(card["elements"][1]["img_key"], "img_v2_x");
    }

    #[test]
    fn test_stand_down_card_is_green() {
        let card = build_alert_card(&alert(Tier::Normal, None), "Fire alarm", at());
        assert_eq!(card["header"]["template"], "green");
        let note = card["elements"][2]["elements"][0]["content"].as_str().unwrap();
        assert!(!note.contains("acknowledge"));
    }
}
