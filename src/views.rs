pub const MAIN_SECTION: &str = "mainPage";
pub const MEMBERS_SECTION: &str = "members-detail";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionVisibility {
    pub id: String,
    pub visible: bool,
}

/// Knows every top-level section of the site and which one is showing.
#[derive(Debug, Clone)]
pub struct ViewSwitcher {
    sections: Vec<String>,
}

impl ViewSwitcher {
    pub fn new<'a>(event_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut sections = vec![MAIN_SECTION.to_string()];
        sections.extend(event_ids.into_iter().map(str::to_string));
        sections.push(MEMBERS_SECTION.to_string());
        Self { sections }
    }

    /// Exactly one section comes back visible. Unknown targets show the main
    /// page.
    pub fn show(&self, target: &str) -> Vec<SectionVisibility> {
        let target = if self.sections.iter().any(|id| id == target) {
            target
        } else {
            MAIN_SECTION
        };

        self.sections
            .iter()
            .map(|id| SectionVisibility {
                id: id.clone(),
                visible: id == target,
            })
            .collect()
    }
}
