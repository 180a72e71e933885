use serde::{Deserialize, Serialize};

use crate::platform::{Document, DocumentField};
use crate::roster::Roster;
use crate::style::{fancy_category_name, MemberStyle};

/// Fixed presentation details of the roster document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Title doubles as the signature used to recognise an existing roster message
    pub title: String,
    pub color: u32,
    pub empty_placeholder: String,
    pub image_url: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: "🌘 Eclipse Official Roster".to_string(),
            color: 0x9B59B6,
            empty_placeholder: "*Vacío*".to_string(),
            image_url: Some("https://i.imgur.com/I2LPjko.gif".to_string()),
        }
    }
}

/// Render the roster into its display document. Pure and deterministic.
pub fn render_roster(roster: &Roster, style: MemberStyle, options: &RenderOptions) -> Document {
    let fields = roster
        .categories()
        .iter()
        .map(|category| {
            let value = if category.members.is_empty() {
                options.empty_placeholder.clone()
            } else {
                let list = category
                    .members
                    .iter()
                    .map(|member| style.decorate(member))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("\n\n```\n{list}\n```")
            };
            DocumentField {
                name: format!("**{}**", fancy_category_name(&category.name)),
                value,
            }
        })
        .collect();

    Document {
        title: Some(options.title.clone()),
        description: None,
        color: Some(options.color),
        fields,
        footer: Some(format!("Member Count: {}", roster.member_count())),
        image_url: options.image_url.clone(),
        timestamp_ms: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_members_in_code_blocks_and_placeholders() {
        let mut roster = Roster::with_categories(["Staff", "Trial"]);
        roster.add_member("Staff", "maria").unwrap();
        roster.add_member("Staff", "ana").unwrap();

        let doc = render_roster(&roster, MemberStyle::Flecha, &RenderOptions::default());

        assert_eq!(doc.title.as_deref(), Some("🌘 Eclipse Official Roster"));
        assert_eq!(doc.fields.len(), 2);
        assert_eq!(doc.fields[0].name, "**𝓢taff**");
        assert_eq!(doc.fields[0].value, "\n\n```\n➤ Ana\n➤ Maria\n```");
        assert_eq!(doc.fields[1].name, "**𝓣rial**");
        assert_eq!(doc.fields[1].value, "*Vacío*");
        assert_eq!(doc.footer.as_deref(), Some("Member Count: 2"));
        assert!(doc.image_url.is_some());
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut roster = Roster::with_categories(["Council"]);
        roster.add_member("Council", "zed").unwrap();
        let options = RenderOptions::default();
        assert_eq!(
            render_roster(&roster, MemberStyle::Corona, &options),
            render_roster(&roster.snapshot(), MemberStyle::Corona, &options)
        );
    }

    #[test]
    fn empty_roster_still_has_footer() {
        let doc = render_roster(&Roster::new(), MemberStyle::default(), &RenderOptions::default());
        assert!(doc.fields.is_empty());
        assert_eq!(doc.footer.as_deref(), Some("Member Count: 0"));
    }
}
