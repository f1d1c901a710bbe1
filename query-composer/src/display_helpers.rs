use std::fmt;
use std::fmt::Display;

/// Writes selection blocks either on one line or indented by two spaces per level.
pub(crate) struct State<'fmt, 'fmt2> {
    indent_level: usize,
    pretty: bool,
    output: &'fmt mut fmt::Formatter<'fmt2>,
}

impl<'a, 'b> State<'a, 'b> {
    /// `{:#}` selects the indented layout.
    pub(crate) fn new(output: &'a mut fmt::Formatter<'b>) -> State<'a, 'b> {
        Self {
            indent_level: 0,
            pretty: output.alternate(),
            output,
        }
    }

    pub(crate) fn write<T: fmt::Display>(&mut self, value: T) -> fmt::Result {
        write!(self.output, "{}", value)
    }

    pub(crate) fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        self.output.write_fmt(args)
    }

    fn new_line(&mut self) -> fmt::Result {
        self.write("\n")?;
        for _ in 0..self.indent_level {
            self.write("  ")?
        }
        Ok(())
    }

    /// Space between two items of a block.
    pub(crate) fn separator(&mut self) -> fmt::Result {
        if self.pretty {
            self.new_line()
        } else {
            self.write(" ")
        }
    }

    pub(crate) fn indent(&mut self) -> fmt::Result {
        self.indent_level += 1;
        self.separator()
    }

    pub(crate) fn dedent(&mut self) -> fmt::Result {
        self.indent_level = self.indent_level.saturating_sub(1);
        self.separator()
    }

    /// Writes `{ item item }` using `write_item` for each item.
    pub(crate) fn block<T>(
        &mut self,
        items: impl IntoIterator<Item = T>,
        mut write_item: impl FnMut(&mut Self, T) -> fmt::Result,
    ) -> fmt::Result {
        self.write("{")?;
        self.indent()?;
        for (index, item) in items.into_iter().enumerate() {
            if index > 0 {
                self.separator()?;
            }
            write_item(self, item)?;
        }
        self.dedent()?;
        self.write("}")
    }
}

/// Displays items separated by `, `.
pub(crate) struct DisplayCommaSeparated<I>(pub(crate) I);

impl<I> Display for DisplayCommaSeparated<I>
where
    I: Clone + IntoIterator,
    I::Item: Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.0.clone().into_iter();
        if let Some(item) = iter.next() {
            write!(f, "{item}")?;
        }
        iter.try_for_each(|item| write!(f, ", {item}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Block(&'static [&'static str]);

    impl Display for Block {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let mut state = State::new(f);
            state.write("node ")?;
            state.block(self.0.iter(), |state, item| state.write(item))
        }
    }

    #[test]
    fn compact_and_pretty_layouts() {
        let block = Block(&["a", "b"]);
        assert_eq!(block.to_string(), "node { a b }");
        assert_eq!(format!("{block:#}"), "node {\n  a\n  b\n}");
    }

    #[test]
    fn comma_separated() {
        assert_eq!(DisplayCommaSeparated([1, 2, 3].iter()).to_string(), "1, 2, 3");
        assert_eq!(DisplayCommaSeparated(Vec::<u8>::new()).to_string(), "");
    }
}
