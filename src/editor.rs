/// 新建策略时填充的代码模板
pub const STRATEGY_TEMPLATE: &str = "\
# 新策略
# 实现 generate_signals(data) 并返回目标持仓权重

def generate_signals(data):
    # data: 含 open/high/low/close/volume 列的行情表
    signals = data[\"close\"].pct_change()
    return signals.clip(-1, 1)
";

/// 策略代码编辑缓冲。整个应用只有一个实例，随面板复用；
/// 光标按字符计数，中文注释等多字节内容可以安全编辑。
pub struct CodeEditor {
    lines: Vec<String>,
    pub cursor_row: usize,
    pub cursor_col: usize,
    pub scroll: u16,
}

impl CodeEditor {
    pub fn new() -> Self {
        let mut editor = Self {
            lines: vec![String::new()],
            cursor_row: 0,
            cursor_col: 0,
            scroll: 0,
        };
        editor.load(STRATEGY_TEMPLATE);
        editor
    }

    /// 整体替换缓冲内容。没有脏状态检查：未保存的编辑会被
    /// 直接丢弃，不弹任何确认（与删除操作的确认框不对称，现状如此）。
    pub fn load(&mut self, text: &str) {
        self.lines = text.split('\n').map(|l| l.to_string()).collect();
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.cursor_row = 0;
        self.cursor_col = 0;
        self.scroll = 0;
    }

    pub fn reset_template(&mut self) {
        self.load(STRATEGY_TEMPLATE);
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_char_len(&self, row: usize) -> usize {
        self.lines[row].chars().count()
    }

    fn byte_index(line: &str, char_idx: usize) -> usize {
        line.char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(line.len())
    }

    pub fn insert_char(&mut self, ch: char) {
        let idx = Self::byte_index(&self.lines[self.cursor_row], self.cursor_col);
        self.lines[self.cursor_row].insert(idx, ch);
        self.cursor_col += 1;
    }

    pub fn insert_newline(&mut self) {
        let idx = Self::byte_index(&self.lines[self.cursor_row], self.cursor_col);
        let rest = self.lines[self.cursor_row].split_off(idx);
        self.lines.insert(self.cursor_row + 1, rest);
        self.cursor_row += 1;
        self.cursor_col = 0;
    }

    pub fn backspace(&mut self) {
        if self.cursor_col > 0 {
            let idx = Self::byte_index(&self.lines[self.cursor_row], self.cursor_col - 1);
            self.lines[self.cursor_row].remove(idx);
            self.cursor_col -= 1;
        } else if self.cursor_row > 0 {
            let line = self.lines.remove(self.cursor_row);
            self.cursor_row -= 1;
            self.cursor_col = self.line_char_len(self.cursor_row);
            self.lines[self.cursor_row].push_str(&line);
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
        } else if self.cursor_row > 0 {
            self.cursor_row -= 1;
            self.cursor_col = self.line_char_len(self.cursor_row);
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor_col < self.line_char_len(self.cursor_row) {
            self.cursor_col += 1;
        } else if self.cursor_row + 1 < self.lines.len() {
            self.cursor_row += 1;
            self.cursor_col = 0;
        }
    }

    pub fn move_up(&mut self) {
        if self.cursor_row > 0 {
            self.cursor_row -= 1;
            self.cursor_col = self.cursor_col.min(self.line_char_len(self.cursor_row));
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor_row + 1 < self.lines.len() {
            self.cursor_row += 1;
            self.cursor_col = self.cursor_col.min(self.line_char_len(self.cursor_row));
        }
    }

    pub fn move_home(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_col = self.line_char_len(self.cursor_row);
    }
}

impl Default for CodeEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_editor_is_seeded_with_template() {
        let editor = CodeEditor::new();
        assert_eq!(editor.text(), STRATEGY_TEMPLATE);
        assert!(editor.line_count() > 1);
    }

    #[test]
    fn load_replaces_unsaved_edits_silently() {
        let mut editor = CodeEditor::new();
        editor.move_end();
        editor.insert_char('x');
        assert_ne!(editor.text(), STRATEGY_TEMPLATE);

        editor.load("def generate_signals(data):\n    return data");
        assert_eq!(editor.text(), "def generate_signals(data):\n    return data");
        assert_eq!((editor.cursor_row, editor.cursor_col), (0, 0));
    }

    #[test]
    fn multibyte_insert_and_backspace() {
        let mut editor = CodeEditor::new();
        editor.load("");
        for ch in "动量策略".chars() {
            editor.insert_char(ch);
        }
        assert_eq!(editor.text(), "动量策略");
        editor.backspace();
        assert_eq!(editor.text(), "动量策");
        assert_eq!(editor.cursor_col, 3);
    }

    #[test]
    fn newline_splits_line_at_cursor() {
        let mut editor = CodeEditor::new();
        editor.load("abcdef");
        editor.cursor_col = 3;
        editor.insert_newline();
        assert_eq!(editor.text(), "abc\ndef");
        assert_eq!((editor.cursor_row, editor.cursor_col), (1, 0));
    }

    #[test]
    fn backspace_at_line_start_merges_lines() {
        let mut editor = CodeEditor::new();
        editor.load("abc\ndef");
        editor.cursor_row = 1;
        editor.cursor_col = 0;
        editor.backspace();
        assert_eq!(editor.text(), "abcdef");
        assert_eq!((editor.cursor_row, editor.cursor_col), (0, 3));
    }

    #[test]
    fn vertical_moves_clamp_column() {
        let mut editor = CodeEditor::new();
        editor.load("long line here\nab");
        editor.move_end();
        editor.move_down();
        assert_eq!(editor.cursor_row, 1);
        assert_eq!(editor.cursor_col, 2);
    }
}
