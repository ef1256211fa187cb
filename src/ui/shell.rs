use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use log::warn;
use thiserror::Error;

use crate::api::models::{Contact, parse_form_labels};
use crate::app::Settings;
use crate::book::{self, ContactBook};
use crate::csv::DEFAULT_FILE_NAME;
use crate::store;
use crate::sync::LoadSource;
use crate::ui::table;
use crate::utils;

const HELP: &str = "\
commands:
  list                  show all contacts
  add                   add a contact (prompts for each field)
  edit <id>             edit a contact in place (blank input keeps a field)
  delete <id>           delete a contact
  undo                  bring back the last deleted contact
  fav <id>              toggle favorite
  search [query]        search all fields
  sort                  sort by name (alternates ascending/descending)
  category <name>       contacts in a category
  country <name>        contacts in a country
  favorites             favorite contacts
  birthdays             today's birthdays
  stats                 contact counts
  export [path]         write a CSV file (default contacts.csv)
  import <path>         replace all contacts with a CSV file
  restore               undo the last import
  remote <url|off>      change or disable the remote service
  help                  this text
  quit                  exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTarget {
    Off,
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Add,
    Edit(String),
    Delete(String),
    Undo,
    Favorite(String),
    Search(String),
    Sort,
    Category(String),
    Country(String),
    Favorites,
    Birthdays,
    Stats,
    Export(PathBuf),
    Import(PathBuf),
    Restore,
    Remote(RemoteTarget),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command {0:?}, try `help`")]
    Unknown(String),

    #[error("`{0}` needs {1}")]
    MissingArgument(&'static str, &'static str),
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let required = |name: &'static str, what: &'static str| -> Result<String, ParseError> {
            if rest.is_empty() {
                Err(ParseError::MissingArgument(name, what))
            } else {
                Ok(rest.to_string())
            }
        };

        let cmd = match word.to_lowercase().as_str() {
            "list" | "all" | "ls" => Command::List,
            "add" | "new" => Command::Add,
            "edit" => Command::Edit(required("edit", "an id")?),
            "delete" | "del" | "rm" => Command::Delete(required("delete", "an id")?),
            "undo" => Command::Undo,
            "fav" | "favorite" => Command::Favorite(required("fav", "an id")?),
            "search" | "find" => Command::Search(rest.to_string()),
            "sort" => Command::Sort,
            "category" => Command::Category(required("category", "a name")?),
            "country" => Command::Country(required("country", "a name")?),
            "favorites" | "favs" => Command::Favorites,
            "birthdays" => Command::Birthdays,
            "stats" | "count" => Command::Stats,
            "export" => Command::Export(PathBuf::from(if rest.is_empty() {
                DEFAULT_FILE_NAME
            } else {
                rest
            })),
            "import" => Command::Import(PathBuf::from(required("import", "a file path")?)),
            "restore" => Command::Restore,
            "remote" => {
                let target = required("remote", "a url or `off`")?;
                if target.eq_ignore_ascii_case("off") {
                    Command::Remote(RemoteTarget::Off)
                } else {
                    Command::Remote(RemoteTarget::Url(target))
                }
            }
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(Some(cmd))
    }
}

const FORM_FIELDS: [&str; 13] = [
    "ID",
    "First name",
    "Last name",
    "Phone",
    "Email",
    "Category",
    "Country",
    "Birthday (YYYY-MM-DD)",
    "Address",
    "City",
    "Labels (comma separated)",
    "Notes",
    "Image URL",
];

fn form_values(c: &Contact) -> [String; 13] {
    [
        c.id.clone(),
        c.first_name.clone(),
        c.last_name.clone(),
        c.phone.clone(),
        c.email.clone(),
        c.category.clone(),
        c.country.clone(),
        c.birthday.clone(),
        c.address.clone(),
        c.city.clone(),
        c.labels.join(", "),
        c.notes.clone(),
        c.image_url.clone(),
    ]
}

fn contact_from_form(values: [String; 13]) -> Contact {
    let [id, first_name, last_name, phone, email, category, country, birthday, address, city, labels, notes, image_url] =
        values;
    Contact {
        id,
        first_name,
        last_name,
        phone,
        email,
        category,
        country,
        birthday,
        address,
        city,
        labels: parse_form_labels(&labels),
        notes,
        image_url,
        favorite: false,
    }
}

/// Interactive front end: reads commands from `input`, writes views and alerts to `out`.
pub struct Shell<R, W> {
    book: ContactBook,
    settings: Settings,
    config_path: Option<PathBuf>,
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(
        book: ContactBook,
        settings: Settings,
        config_path: Option<PathBuf>,
        input: R,
        out: W,
    ) -> Self {
        Self {
            book,
            settings,
            config_path,
            input,
            out,
        }
    }

    pub fn book(&self) -> &ContactBook {
        &self.book
    }

    /// Startup banner plus the one-time birthday check.
    pub fn greet(&mut self, source: LoadSource, today: NaiveDate) -> io::Result<()> {
        let count = self.book.contacts().len();
        match source {
            LoadSource::Remote => writeln!(self.out, "Loaded {count} contacts from the remote service.")?,
            LoadSource::LocalCache => writeln!(self.out, "Loaded {count} contacts from the local cache.")?,
            LoadSource::Empty => writeln!(self.out, "No saved contacts, starting empty.")?,
        }
        if let Some(notice) = self.book.birthday_notice(today) {
            writeln!(self.out, "{notice}")?;
        }
        writeln!(self.out, "Type `help` for commands.")
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }

    fn prompt(&mut self, label: &str, current: Option<&str>) -> io::Result<Option<String>> {
        match current {
            Some(value) if !value.is_empty() => write!(self.out, "{label} [{value}]: ")?,
            _ => write!(self.out, "{label}: ")?,
        }
        self.out.flush()?;
        Ok(self.read_line()?.map(|l| l.trim().to_string()))
    }

    /// Runs until `quit`, end of input or a terminal error, then drains pending remote changes.
    pub fn run(&mut self) -> io::Result<()> {
        let result = self.command_loop();
        self.book.shutdown();
        result
    }

    fn command_loop(&mut self) -> io::Result<()> {
        loop {
            write!(self.out, "> ")?;
            self.out.flush()?;
            let Some(line) = self.read_line()? else {
                writeln!(self.out)?;
                break;
            };
            match Command::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(cmd)) => self.execute(cmd, chrono::Local::now().date_naive())?,
                Ok(None) => {}
                Err(e) => writeln!(self.out, "{e}")?,
            }
            if let Some(e) = self.book.take_save_error() {
                writeln!(self.out, "warning: change kept in memory but not saved locally: {e}")?;
            }
        }
        Ok(())
    }

    pub fn execute(&mut self, cmd: Command, today: NaiveDate) -> io::Result<()> {
        match cmd {
            Command::List => table::render(&mut self.out, &self.book.search("")),
            Command::Add => self.add(),
            Command::Edit(id) => self.edit(&id),
            Command::Delete(id) => match self.book.delete(&id) {
                Ok(c) => writeln!(self.out, "Deleted {} ({}).", c.full_name(), c.id),
                Err(e) => self.report(e),
            },
            Command::Undo => match self.book.undo_delete() {
                Some(c) => writeln!(self.out, "Restored {} ({}).", c.full_name(), c.id),
                None => writeln!(self.out, "Nothing to undo."),
            },
            Command::Favorite(id) => match self.book.toggle_favorite(&id) {
                Ok(true) => writeln!(self.out, "Marked {id} as favorite."),
                Ok(false) => writeln!(self.out, "Removed {id} from favorites."),
                Err(e) => self.report(e),
            },
            Command::Search(query) => table::render(&mut self.out, &self.book.search(&query)),
            Command::Sort => {
                let view = self.book.sort_by_name();
                table::render(&mut self.out, &view)
            }
            Command::Category(name) => {
                table::render(&mut self.out, &self.book.filter_by_category(&name))
            }
            Command::Country(name) => {
                table::render(&mut self.out, &self.book.filter_by_country(&name))
            }
            Command::Favorites => match self.book.favorites() {
                Some(view) => table::render(&mut self.out, &view),
                None => writeln!(self.out, "No favorite contacts found."),
            },
            Command::Birthdays => match self.book.birthday_notice(today) {
                Some(notice) => writeln!(self.out, "{notice}"),
                None => writeln!(self.out, "No birthdays today."),
            },
            Command::Stats => {
                let (total, by_category) = self.book.stats();
                writeln!(self.out, "{total} contact(s)")?;
                for (category, count) in by_category {
                    let name = if category.is_empty() { "(none)" } else { category.as_str() };
                    writeln!(self.out, "  {name}: {count}")?;
                }
                Ok(())
            }
            Command::Export(path) => match self.book.export_file(&path) {
                Ok(n) => writeln!(self.out, "Exported {n} contact(s) to {}.", path.display()),
                Err(e) => self.report(e),
            },
            Command::Import(path) => match self.book.import_file(&path) {
                Ok(n) => writeln!(
                    self.out,
                    "Imported {n} contact(s). Use `restore` to go back to the previous list."
                ),
                Err(e) => self.report(e),
            },
            Command::Restore => match self.book.restore() {
                Some(n) => writeln!(self.out, "Restored {n} contact(s) from before the import."),
                None => writeln!(self.out, "Nothing to restore: no import since the last restore."),
            },
            Command::Remote(target) => self.set_remote(target),
            Command::Help => writeln!(self.out, "{HELP}"),
            Command::Quit => Ok(()),
        }
    }

    fn report(&mut self, err: book::Error) -> io::Result<()> {
        match err {
            book::Error::Store(store::Error::Duplicate { .. }) => {
                writeln!(self.out, "Duplicate contact (same email & phone) not allowed.")
            }
            other => writeln!(self.out, "{other}"),
        }
    }

    /// Collects the form; `None` when input ended midway.
    fn fill_form(&mut self, current: Option<&Contact>) -> io::Result<Option<[String; 13]>> {
        let mut values = current.map(form_values).unwrap_or_default();
        let editing = current.is_some();
        // the id is fixed while editing
        for (i, label) in FORM_FIELDS.iter().enumerate().skip(usize::from(editing)) {
            let shown = editing.then(|| values[i].clone());
            let Some(answer) = self.prompt(label, shown.as_deref())? else {
                return Ok(None);
            };
            if !(editing && answer.is_empty()) {
                values[i] = answer;
            }
        }
        Ok(Some(values))
    }

    fn add(&mut self) -> io::Result<()> {
        let Some(values) = self.fill_form(None)? else {
            return writeln!(self.out, "\nAdd cancelled.");
        };
        let contact = contact_from_form(values);
        if contact.id.is_empty() || contact.first_name.is_empty() {
            return writeln!(self.out, "ID and first name are required.");
        }
        let name = contact.full_name();
        match self.book.add(contact) {
            Ok(()) => writeln!(self.out, "Added {name}."),
            Err(e) => self.report(e),
        }
    }

    fn edit(&mut self, id: &str) -> io::Result<()> {
        let Some(current) = self.book.get(id).cloned() else {
            return writeln!(self.out, "No contact with id {id:?}.");
        };
        let Some(values) = self.fill_form(Some(&current))? else {
            return writeln!(self.out, "\nEdit cancelled.");
        };
        match self.book.update(id, contact_from_form(values)) {
            Ok(()) => writeln!(self.out, "Updated {id}."),
            Err(e) => self.report(e),
        }
    }

    fn set_remote(&mut self, target: RemoteTarget) -> io::Result<()> {
        match target {
            RemoteTarget::Off => self.settings.remote_enabled = false,
            RemoteTarget::Url(url) => {
                self.settings.base_url = utils::normalize_url(&url);
                self.settings.remote_enabled = true;
            }
        }
        let remote = self.settings.remote_client();
        let enabled = remote.is_some();
        self.book.set_remote(remote);
        if let Some(path) = &self.config_path {
            if let Err(e) = self.settings.save_to(path) {
                warn!("could not save settings to {}: {e}", path.display());
            }
        }
        if enabled {
            writeln!(self.out, "Mirroring changes to {}.", self.settings.base_url)
        } else {
            writeln!(self.out, "Remote service off, changes stay local.")
        }
    }
}
