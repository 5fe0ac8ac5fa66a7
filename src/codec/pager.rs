// pager.rs - fixed-size response pages

/// Splits rendered lines into pages of exactly `page_size` slots
pub struct Pager {
    pub page_size: usize,
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self { page_size }
    }

    /// The last page is padded with empty strings; no input means no pages.
    pub fn paginate(&self, lines: &[String]) -> Vec<Vec<String>> {
        lines
            .chunks(self.page_size)
            .map(|chunk| {
                let mut page = chunk.to_vec();
                page.resize(self.page_size, String::new());
                page
            })
            .collect()
    }
}

pub fn paginate(lines: &[String], page_size: usize) -> Vec<Vec<String>> {
    Pager::new(page_size).paginate(lines)
}
