//! Indented C++ text writer shared by the emission passes.

#[derive(Debug, Default)]
pub struct CppWriter {
    out: String,
    indent: usize,
}

impl CppWriter {
    pub fn line(&mut self, s: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(s);
        self.out.push('\n');
    }

    pub fn lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for l in lines {
            self.line(l.as_ref());
        }
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    pub fn open_block(&mut self) {
        self.line("{");
        self.indent += 1;
    }

    pub fn close_block(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.line("}");
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Body of a C string literal for `s`. Non-printable bytes use three-digit octal
/// escapes, which cannot run into a following digit the way `\x` escapes do.
pub fn c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{b:03o}")),
        }
    }
    out
}

/// `"s"` as a quoted C string literal.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", c_string(s))
}
