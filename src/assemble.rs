//! Final LaTeX document assembly.

use crate::settings::Settings;

/// Builds the complete `.tex` document around the converted body.
pub struct LatexAssembler<'a> {
    settings: &'a Settings,
}

impl<'a> LatexAssembler<'a> {
    /// Create an assembler.
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Assemble preamble, document start, body and document end.
    pub fn assemble(&self, lines: &[String]) -> String {
        let mut document = [
            self.preamble(),
            self.document_start(),
            self.main_body(lines),
            self.document_end(),
        ]
        .join("\n\n");
        document.push('\n');
        document
    }

    /// Document class, packages and global configuration.
    pub fn preamble(&self) -> String {
        let s = self.settings;
        let font_size = if s.font_size.trim().is_empty() {
            String::new()
        } else {
            format!("[{}]", s.font_size.trim())
        };
        let geometry = if s.margin.trim().is_empty() {
            "\\usepackage{geometry}".to_string()
        } else {
            format!("\\usepackage[margin={}]{{geometry}}", s.margin.trim())
        };

        let mut lines = vec![
            format!("\\documentclass{}{{{}}}", font_size, s.document_class),
            "\\usepackage[table]{xcolor}".to_string(),
            "\\usepackage{tabularx}".to_string(),
            "\\usepackage{longtable}".to_string(),
            "\\usepackage{tabularray}".to_string(),
            "\\usepackage{enumitem,amssymb}".to_string(),
            "\\usepackage{amsmath}".to_string(),
            "\\usepackage{graphicx}".to_string(),
            "\\usepackage{soul}".to_string(),
            "\\usepackage{totcount}".to_string(),
        ];
        if s.bibliography_style == "apacite" {
            lines.push("\\usepackage{apacite}".to_string());
        }
        lines.push("\\usepackage{hyperref}".to_string());
        lines.push(geometry);
        lines.push("\\usepackage{cleveref}".to_string());

        lines.extend(
            [
                "\\newlist{todolist}{itemize}{2}",
                "\\setlist[todolist]{label=$\\square$}",
                "\\newtotcounter{citnum}",
                "\\def\\oldbibitem{} \\let\\oldbibitem=\\bibitem",
                "\\def\\bibitem{\\stepcounter{citnum}\\oldbibitem}",
            ]
            .map(String::from),
        );
        lines.push(format!("\\setlength{{\\parindent}}{{{}pt}}", s.paragraph_indent));
        lines.extend(
            [
                "\\hypersetup{",
                "\tcolorlinks = true,",
                "\turlcolor = blue,",
                "\tlinkcolor = blue,",
                "\tcitecolor = blue",
                "}",
                "\\sethlcolor{yellow}",
                "\\setcounter{secnumdepth}{4}",
                "\\setlength{\\parskip}{7pt}",
                "\\let\\oldmarginpar\\marginpar",
                "\\renewcommand\\marginpar[1]{\\oldmarginpar{\\tiny #1}}",
                "\\newcommand{\\ignore}[1]{}",
            ]
            .map(String::from),
        );
        if s.document_class == "ifacconf" {
            lines.push("\\newcounter{part}".to_string());
            lines.push("\\counterwithin*{section}{part}".to_string());
        }

        lines.join("\n")
    }

    /// `\begin{document}` with optional author and title.
    pub fn document_start(&self) -> String {
        let s = self.settings;
        let mut start = String::from("\\begin{document}");
        if s.allow_display_breaks {
            start.push_str("\n\\allowdisplaybreaks");
        }
        if !s.author.is_empty() {
            start.push_str(&format!("\n\\author{{{}}}", s.author));
        }
        if !s.title.is_empty() {
            start.push_str(&format!("\n\\title{{{}}}\n\\maketitle", s.title));
        }
        start
    }

    /// Converted content, prose before the first `\section` first.
    pub fn main_body(&self, lines: &[String]) -> String {
        let first_section = lines
            .iter()
            .position(|line| line.starts_with("\\section"))
            .unwrap_or(lines.len());
        let (before, sections) = lines.split_at(first_section);

        let mut body = String::new();
        if self.settings.add_table_of_contents {
            body.push_str("\\tableofcontents\n\\newpage\n\n");
        }
        if before.iter().any(|line| !line.trim().is_empty()) {
            body.push_str(&before.join("\n"));
            body.push('\n');
        }
        body.push_str(&sections.join("\n"));
        body
    }

    /// Bibliography and `\end{document}`.
    pub fn document_end(&self) -> String {
        let s = self.settings;
        let mut end = String::new();
        if s.add_new_page_before_bibliography {
            end.push_str("\\newpage\n\n");
        }
        end.push_str(&format!("\\bibliographystyle{{{}}}\n", s.bibliography_style));
        end.push_str(&format!("\\bibliography{{{}}}\n", s.bibliography_file));
        end.push_str("\\end{document}");
        end
    }
}
