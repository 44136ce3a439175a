/// Playback position and the predicates derived from it.

use crate::schema::story::Story;

/// Where playback stands.
///
/// `paragraph` counts paragraphs already revealed on `page`; when it equals
/// the page's paragraph count the page is exhausted but not yet left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackPosition {
    pub page: usize,
    pub paragraph: usize,
}

impl PlaybackPosition {
    pub fn new(page: usize, paragraph: usize) -> Self {
        Self { page, paragraph }
    }

    /// True once every paragraph of `page` has been revealed.
    pub fn is_page_exhausted(&self, story: &Story, page: usize) -> bool {
        match self.page.cmp(&page) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => self.paragraph >= story.paragraph_count(page),
            std::cmp::Ordering::Less => false,
        }
    }

    /// At the boundary of the page currently shown.
    pub fn is_at_page_boundary(&self, story: &Story) -> bool {
        self.paragraph >= story.paragraph_count(self.page)
    }

    pub fn is_first_page_exhausted(&self, story: &Story) -> bool {
        self.page == 0 && self.is_at_page_boundary(story)
    }

    pub fn is_last_page(&self, story: &Story) -> bool {
        self.page + 1 == story.page_count()
    }

    pub fn is_story_complete(&self, story: &Story) -> bool {
        self.is_last_page(story) && self.is_at_page_boundary(story)
    }

    /// Move to the first paragraph of the next page.
    pub fn next_page(&mut self) {
        self.page += 1;
        self.paragraph = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::story::{Page, Paragraph, Position};

    fn story(shape: &[usize]) -> Story {
        Story::new(
            shape
                .iter()
                .map(|&n| {
                    Page::new(
                        (0..n)
                            .map(|i| Paragraph::new(format!("p{}", i), Position::default()))
                            .collect(),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn fresh_position_is_not_exhausted() {
        let story = story(&[3, 2]);
        let pos = PlaybackPosition::default();
        assert!(!pos.is_at_page_boundary(&story));
        assert!(!pos.is_first_page_exhausted(&story));
        assert!(!pos.is_story_complete(&story));
        assert!(!pos.is_page_exhausted(&story, 0));
    }

    #[test]
    fn first_page_boundary() {
        let story = story(&[3, 2]);
        let pos = PlaybackPosition::new(0, 3);
        assert!(pos.is_first_page_exhausted(&story));
        assert!(pos.is_page_exhausted(&story, 0));
        assert!(!pos.is_page_exhausted(&story, 1));
        assert!(!pos.is_story_complete(&story));
    }

    #[test]
    fn earlier_pages_count_as_exhausted() {
        let story = story(&[1, 1, 2]);
        let pos = PlaybackPosition::new(2, 0);
        assert!(pos.is_page_exhausted(&story, 0));
        assert!(pos.is_page_exhausted(&story, 1));
        assert!(!pos.is_page_exhausted(&story, 2));
    }

    #[test]
    fn story_complete_only_on_last_boundary() {
        let story = story(&[2, 2]);
        assert!(!PlaybackPosition::new(1, 1).is_story_complete(&story));
        assert!(PlaybackPosition::new(1, 2).is_story_complete(&story));
        assert!(!PlaybackPosition::new(1, 2).is_first_page_exhausted(&story));
    }

    #[test]
    fn next_page_resets_paragraph() {
        let mut pos = PlaybackPosition::new(0, 3);
        pos.next_page();
        assert_eq!(pos, PlaybackPosition::new(1, 0));
    }
}
