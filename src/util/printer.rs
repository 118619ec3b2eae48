use crate::fs::{Entry, FileType};
use compile_time_ls_colours::file_type_colour;
use std::io::{self, BufWriter, IsTerminal as _, Write, stdout};

const NEWLINE: &[u8] = b"\n";
const NEWLINE_RESET: &[u8] = b"\x1b[0m\n";
const NUL: &[u8] = b"\0";
const RESET: &[u8] = b"\x1b[0m";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/**
 Writes search results to stdout, one per line.

 Colours follow `LS_COLORS` conventions and are only used on a terminal, never when
 `NO_COLOUR` or `NO_COLOR` is set to true.
*/
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    limit: usize,
    nocolour: bool,
    null_terminated: bool,
    long: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            limit: usize::MAX,
            nocolour: false,
            null_terminated: false,
            long: false,
        }
    }

    /// Stop after `limit` entries
    #[must_use]
    pub const fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = match limit {
            Some(lim) => lim,
            None => usize::MAX,
        };
        self
    }

    #[must_use]
    pub const fn nocolour(mut self, nocolour: bool) -> Self {
        self.nocolour = nocolour;
        self
    }

    /// Terminate entries with NUL instead of a newline, for `xargs -0`
    #[must_use]
    pub const fn null_terminated(mut self, null_terminated: bool) -> Self {
        self.null_terminated = null_terminated;
        self
    }

    /// Prefix each path with its type, size and modification time
    #[must_use]
    pub const fn long(mut self, long: bool) -> Self {
        self.long = long;
        self
    }

    /**
     Prints the entries, returning how many were written.

     # Errors
     Any error writing to stdout.
    */
    pub fn print<I: IntoIterator<Item = Entry>>(self, entries: I) -> io::Result<usize> {
        let std_out = stdout();
        let use_colour =
            std_out.is_terminal() && !self.null_terminated && !colour_disabled(self.nocolour);
        let mut writer = BufWriter::new(std_out.lock());
        let written = self.write_to(&mut writer, entries, use_colour)?;
        writer.flush()?;
        Ok(written)
    }

    /// Writes the entries to any sink, the testable half of [`Printer::print`]
    pub(crate) fn write_to<W, I>(
        &self,
        writer: &mut W,
        entries: I,
        use_colour: bool,
    ) -> io::Result<usize>
    where
        W: Write,
        I: IntoIterator<Item = Entry>,
    {
        let mut written = 0;
        for entry in entries.into_iter().take(self.limit) {
            if self.long {
                write_details(writer, &entry)?;
            }
            if use_colour {
                writer.write_all(entry_colour(&entry))?;
                writer.write_all(entry.as_bytes())?;
                writer.write_all(NEWLINE_RESET)?;
            } else {
                writer.write_all(entry.as_bytes())?;
                writer.write_all(if self.null_terminated { NUL } else { NEWLINE })?;
            }
            written += 1;
        }
        Ok(written)
    }
}

fn colour_disabled(nocolour: bool) -> bool {
    nocolour
        || std::env::var("NO_COLOUR").is_ok_and(|x| x.eq_ignore_ascii_case("TRUE"))
        || std::env::var("NO_COLOR").is_ok_and(|x| x.eq_ignore_ascii_case("TRUE"))
}

const fn type_char(file_type: FileType) -> char {
    match file_type {
        FileType::Directory => 'd',
        FileType::Symlink => 'l',
        FileType::RegularFile => '-',
        FileType::BlockDevice => 'b',
        FileType::CharDevice => 'c',
        FileType::Pipe => 'p',
        FileType::Socket => 's',
        FileType::Unknown => '?',
    }
}

fn write_details<W: Write>(writer: &mut W, entry: &Entry) -> io::Result<()> {
    let modified = entry.modified_time().map_or_else(
        || "-".repeat(TIME_FORMAT.len()),
        |time| time.format(TIME_FORMAT).to_string(),
    );
    write!(
        writer,
        "{} {:>12} {} ",
        type_char(entry.file_type()),
        entry.size(),
        modified
    )
}

fn entry_colour(entry: &Entry) -> &[u8] {
    match entry.file_type() {
        FileType::RegularFile | FileType::Unknown => entry
            .extension()
            .map_or(RESET, |ext| file_type_colour!(ext)),
        FileType::Directory => file_type_colour!(directory),
        FileType::Symlink => file_type_colour!(symlink),
        FileType::BlockDevice => file_type_colour!(block_device),
        FileType::CharDevice => file_type_colour!(character_device),
        FileType::Socket => file_type_colour!(socket),
        FileType::Pipe => file_type_colour!(pipe),
    }
}
