//! Run detection for multi-line constructs.
//!
//! Lists, tables and display equations are found by forward scans that
//! return [`Region`] descriptors. Renderers then consume one region at a
//! time via [`rebuild`], so deciding where a run starts and ends is kept
//! apart from deciding how it is rendered.

/// Kind of a detected run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// `-`, `*` or `+` items
    BulletList,
    /// `1.` items
    NumberedList,
    /// Contiguous lines containing `|`
    Table,
    /// `$$ … $$`
    DisplayEquation,
}

/// A run of lines `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// What the run contains
    pub kind: RegionKind,
    /// First line index
    pub start: usize,
    /// One past the last line index
    pub end: usize,
    /// False when the run hit end of input without its terminator
    pub closed: bool,
}

impl Region {
    fn new(kind: RegionKind, start: usize, end: usize, closed: bool) -> Self {
        Self {
            kind,
            start,
            end,
            closed,
        }
    }

    /// Number of lines in the run.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the run is empty.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether line `index` belongs to the run.
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    /// The lines of the run.
    pub fn slice<'a>(&self, lines: &'a [String]) -> &'a [String] {
        &lines[self.start..self.end]
    }
}

/// Per-line flags marking lines claimed by any of `regions`.
pub fn mask(regions: &[Region], len: usize) -> Vec<bool> {
    let mut flags = vec![false; len];
    for region in regions {
        for flag in flags.iter_mut().take(region.end.min(len)).skip(region.start) {
            *flag = true;
        }
    }
    flags
}

/// Replace every region with its rendering; other lines are copied.
///
/// `regions` must be sorted and non-overlapping.
pub fn rebuild<F>(lines: &[String], regions: &[Region], mut render: F) -> Vec<String>
where
    F: FnMut(&Region, &[String]) -> Vec<String>,
{
    let mut output = Vec::with_capacity(lines.len());
    let mut cursor = 0;

    for region in regions {
        output.extend_from_slice(&lines[cursor..region.start]);
        output.extend(render(region, region.slice(lines)));
        cursor = region.end;
    }
    output.extend_from_slice(&lines[cursor..]);

    output
}

// ==================== Lists ====================

/// Marker class of a list line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMarker {
    /// `-`, `*`, `+`
    Bullet,
    /// `\d+.`
    Numbered,
}

/// Classify a line as a list item, returning the item text without marker.
pub fn list_item(line: &str) -> Option<(ListMarker, &str)> {
    let trimmed = line.trim_start();
    let mut chars = trimmed.char_indices();

    match chars.next() {
        Some((_, '-' | '*' | '+')) => {
            let rest = &trimmed[1..];
            let mut rest_chars = rest.chars();
            match rest_chars.next() {
                Some(c) if c.is_whitespace() => {
                    Some((ListMarker::Bullet, &rest[c.len_utf8()..]))
                }
                _ => None,
            }
        }
        Some((_, c)) if c.is_ascii_digit() => {
            let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
            let rest = &trimmed[digits..];
            let rest = rest.strip_prefix('.')?;
            let ws = rest.chars().next()?;
            if ws.is_whitespace() {
                Some((ListMarker::Numbered, &rest[ws.len_utf8()..]))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Find list runs.
///
/// The run kind is fixed by its first line. A blank line, a non-list line
/// or a line flagged in `claimed` ends the run.
pub fn scan_lists(lines: &[String], claimed: &[bool]) -> Vec<Region> {
    let mut regions = Vec::new();
    let mut open: Option<(RegionKind, usize)> = None;

    for (i, line) in lines.iter().enumerate() {
        let is_claimed = claimed.get(i).copied().unwrap_or(false);
        let marker = if is_claimed { None } else { list_item(line) };

        match (open, marker) {
            (None, Some((marker, _))) => {
                let kind = match marker {
                    ListMarker::Bullet => RegionKind::BulletList,
                    ListMarker::Numbered => RegionKind::NumberedList,
                };
                open = Some((kind, i));
            }
            (Some(_), Some(_)) => {}
            (Some((kind, start)), None) => {
                regions.push(Region::new(kind, start, i, true));
                open = None;
            }
            (None, None) => {}
        }
    }

    if let Some((kind, start)) = open {
        log::debug!("list run starting at line {} closed at end of input", start + 1);
        regions.push(Region::new(kind, start, lines.len(), false));
    }

    regions
}

// ==================== Tables ====================

/// A line belongs to a table run when it is non-empty and contains `|`.
pub fn is_table_line(line: &str) -> bool {
    !line.trim().is_empty() && line.contains('|')
}

/// Split a table row into trimmed cells, dropping the empty artifacts
/// produced by a leading or trailing pipe.
pub fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    trimmed.split('|').map(|c| c.trim().to_string()).collect()
}

/// Whether every cell consists of colons and dashes only (`---`, `:-:`).
pub fn is_alignment_row(line: &str) -> bool {
    if !is_table_line(line) {
        return false;
    }
    let cells = split_cells(line);
    !cells.is_empty()
        && cells.iter().all(|cell| {
            !cell.is_empty() && cell.contains('-') && cell.chars().all(|c| c == '-' || c == ':')
        })
}

/// Find contiguous table-like runs.
pub fn scan_tables(lines: &[String], claimed: &[bool]) -> Vec<Region> {
    let mut regions = Vec::new();
    let mut start: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        let is_claimed = claimed.get(i).copied().unwrap_or(false);
        match (start, !is_claimed && is_table_line(line)) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                regions.push(Region::new(RegionKind::Table, s, i, true));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        regions.push(Region::new(RegionKind::Table, s, lines.len(), true));
    }

    regions
}

/// Table runs with a header line followed by an alignment row.
pub fn scan_well_formed_tables(lines: &[String], claimed: &[bool]) -> Vec<Region> {
    scan_tables(lines, claimed)
        .into_iter()
        .filter(|r| r.len() >= 2 && is_alignment_row(&lines[r.start + 1]))
        .collect()
}

// ==================== Display equations ====================

/// Opening of a rendered display-equation block.
pub const EQUATION_BLOCK_START: &str = "\\begin{equation}";

/// Flags the equation blocks already rendered by the equation stage.
///
/// Such blocks may contain `|` and must not join a table run.
pub fn rendered_equations(lines: &[String]) -> Vec<bool> {
    lines
        .iter()
        .map(|line| line.trim_start().starts_with(EQUATION_BLOCK_START))
        .collect()
}

/// Display-math delimiter.
pub const DISPLAY_DELIMITER: &str = "$$";

/// Find `$$` regions.
///
/// A line with an even, non-zero number of delimiters is a complete
/// single-line region. A region left open at end of input is closed at
/// the last line.
pub fn scan_equations(lines: &[String]) -> Vec<Region> {
    let mut regions = Vec::new();
    let mut open: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        let delimiters = line.matches(DISPLAY_DELIMITER).count();
        match open {
            None if delimiters == 0 => {}
            None if delimiters % 2 == 0 => {
                regions.push(Region::new(RegionKind::DisplayEquation, i, i + 1, true));
            }
            None => open = Some(i),
            Some(start) if delimiters > 0 => {
                regions.push(Region::new(RegionKind::DisplayEquation, start, i + 1, true));
                open = None;
            }
            Some(_) => {}
        }
    }

    if let Some(start) = open {
        log::debug!(
            "display equation opened at line {} is unterminated; closing at end of input",
            start + 1
        );
        regions.push(Region::new(
            RegionKind::DisplayEquation,
            start,
            lines.len(),
            false,
        ));
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.split('\n').map(str::to_string).collect()
    }

    #[test]
    fn test_list_item_markers() {
        assert_eq!(list_item("- a"), Some((ListMarker::Bullet, "a")));
        assert_eq!(list_item("  * b c"), Some((ListMarker::Bullet, "b c")));
        assert_eq!(list_item("+ d"), Some((ListMarker::Bullet, "d")));
        assert_eq!(list_item("12. twelve"), Some((ListMarker::Numbered, "twelve")));
        assert_eq!(list_item("---"), None);
        assert_eq!(list_item("*emphasis*"), None);
        assert_eq!(list_item("3.14 is pi"), None);
        assert_eq!(list_item("plain"), None);
    }

    #[test]
    fn test_scan_lists_kind_fixed_by_first_line() {
        let input = lines("- a\n1. b\n* c\n\ntext\n1. x\n2. y");
        let regions = scan_lists(&input, &[]);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].kind, RegionKind::BulletList);
        assert_eq!((regions[0].start, regions[0].end), (0, 3));
        assert!(regions[0].closed);
        assert_eq!(regions[1].kind, RegionKind::NumberedList);
        assert_eq!((regions[1].start, regions[1].end), (5, 7));
        assert!(!regions[1].closed);
    }

    #[test]
    fn test_scan_lists_respects_claimed_lines() {
        let input = lines("- a\n- b\n- c");
        let claimed = vec![false, true, false];
        let regions = scan_lists(&input, &claimed);
        assert_eq!(regions.len(), 2);
        assert_eq!((regions[0].start, regions[0].end), (0, 1));
        assert_eq!((regions[1].start, regions[1].end), (2, 3));
    }

    #[test]
    fn test_split_cells() {
        assert_eq!(split_cells("| a | b |"), vec!["a", "b"]);
        assert_eq!(split_cells("a | b"), vec!["a", "b"]);
        assert_eq!(split_cells("| a |  | c |"), vec!["a", "", "c"]);
    }

    #[test]
    fn test_alignment_row() {
        assert!(is_alignment_row("|---|:-:|--:|"));
        assert!(is_alignment_row(":--- | ---"));
        assert!(!is_alignment_row("| a | b |"));
        assert!(!is_alignment_row("| : | - |"));
        assert!(!is_alignment_row("---"));
    }

    #[test]
    fn test_scan_tables() {
        let input = lines("text\n| a | b |\n|---|---|\n| 1 | 2 |\n\n| lone |");
        let runs = scan_tables(&input, &[]);
        assert_eq!(runs.len(), 2);
        assert_eq!((runs[0].start, runs[0].end), (1, 4));
        assert_eq!((runs[1].start, runs[1].end), (5, 6));

        let tables = scan_well_formed_tables(&input, &[]);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].start, 1);
    }

    #[test]
    fn test_claimed_lines_break_table_runs() {
        let mut input = vec!["\\begin{equation}\n\t|x|\n\\end{equation}".to_string()];
        input.extend(lines("| a |\n|---|\n| 1 |"));
        let claimed = rendered_equations(&input);
        assert_eq!(claimed, vec![true, false, false, false]);

        let runs = scan_tables(&input, &claimed);
        assert_eq!(runs.len(), 1);
        assert_eq!((runs[0].start, runs[0].end), (1, 4));
        assert_eq!(scan_well_formed_tables(&input, &claimed).len(), 1);
        assert!(scan_well_formed_tables(&input, &[]).is_empty());
    }

    #[test]
    fn test_scan_equations() {
        let input = lines("a\n$$\nx = 1\n$$\n$$y$$\nb\n$$ z");
        let regions = scan_equations(&input);
        assert_eq!(regions.len(), 3);
        assert_eq!((regions[0].start, regions[0].end), (1, 4));
        assert_eq!((regions[1].start, regions[1].end), (4, 5));
        assert_eq!((regions[2].start, regions[2].end), (6, 7));
        assert!(!regions[2].closed);
    }

    #[test]
    fn test_rebuild_and_mask() {
        let input = lines("a\nb\nc\nd");
        let regions = vec![Region::new(RegionKind::Table, 1, 3, true)];
        let out = rebuild(&input, &regions, |_, slice| vec![slice.join("+")]);
        assert_eq!(out, vec!["a", "b+c", "d"]);
        assert_eq!(mask(&regions, 4), vec![false, true, true, false]);
    }
}
