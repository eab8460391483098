use std::cell::RefCell;
use std::io::{BufRead, Read, Write};
use std::path::Path;

use codespan_reporting::diagnostic::{Diagnostic, Severity};
use codespan_reporting::term::termcolor::{BufferedStandardStream, ColorChoice, WriteColor};
use itertools::Itertools;
use pretty::RcDoc;

use crate::core::formers::Registry;
use crate::core::globals::Globals;
use crate::core::typing::{self, TypeError};
use crate::core::{pretty as core_pretty, Checkable, Inferable};
use crate::files::{FileId, Files};
use crate::surface::elaboration::{self, ElabError};
use crate::surface::{self, Decl, ParseError, Term};

const REPL_PROMPT: &str = "λΠ> ";

const REPL_BANNER: &str = "\
Commands:
  axiom <name>, ... : <type>    postulate names of a type
  defun <name> = <expr>         define a name
  check <expr>                  normalise an expression and show its type
  <expr>                        same as `check <expr>`
  :env                          list the global environment
  :clear, :cls                  clear the global environment
  :help, :h                     show this message
  :quit, :q                     leave the REPL";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error,
}

impl Status {
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Error => 1,
        }
    }
}

/// Errors that prevent a declaration from being committed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Elab(#[from] ElabError),
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl Error {
    pub fn to_diagnostic(&self) -> Diagnostic<FileId> {
        match self {
            Error::Parse(error) => error.to_diagnostic(),
            Error::Elab(error) => error.to_diagnostic(),
            Error::Type(error) => error.to_diagnostic(),
        }
    }
}

pub struct Driver {
    files: Files,
    registry: Registry,
    globals: Globals,
    repl_inputs: usize,

    allow_errors: bool,
    seen_errors: RefCell<bool>,
    codespan_config: codespan_reporting::term::Config,
    diagnostic_writer: RefCell<Box<dyn WriteColor>>,

    emit_width: usize,
    emit_writer: RefCell<Box<dyn WriteColor>>,
}

impl Driver {
    pub fn new() -> Driver {
        Driver {
            files: Files::new(),
            registry: Registry::builtin(),
            globals: Globals::new(),
            repl_inputs: 0,

            allow_errors: false,
            seen_errors: RefCell::new(false),
            codespan_config: codespan_reporting::term::Config::default(),
            diagnostic_writer: RefCell::new(Box::new(BufferedStandardStream::stderr(
                if atty::is(atty::Stream::Stderr) {
                    ColorChoice::Auto
                } else {
                    ColorChoice::Never
                },
            ))),

            emit_width: usize::MAX,
            emit_writer: RefCell::new(Box::new(BufferedStandardStream::stdout(
                if atty::is(atty::Stream::Stdout) {
                    ColorChoice::Auto
                } else {
                    ColorChoice::Never
                },
            ))),
        }
    }

    /// Setup a global panic hook
    pub fn install_panic_hook(&self) {
        use crate::core::semantics;

        // Use the currently set codespan configuration
        let term_config = self.codespan_config.clone();
        // Fetch the default hook (which prints the panic message and an optional backtrace)
        let default_hook = std::panic::take_hook();

        std::panic::set_hook(Box::new(move |info| {
            let location = info.location();
            let message = if let Some(error) = info.payload().downcast_ref::<semantics::Error>() {
                error.description()
            } else if let Some(message) = info.payload().downcast_ref::<String>() {
                message.as_str()
            } else if let Some(message) = info.payload().downcast_ref::<&str>() {
                message
            } else {
                "unknown panic type"
            };

            let diagnostic = Diagnostic::bug()
                .with_message(format!("compiler panicked at '{message}'"))
                .with_notes(vec![
                    match location {
                        Some(location) => format!("panicked at: {location}"),
                        None => "panicked at: unknown location".to_owned(),
                    },
                    "this is a bug in lambdapi, not in the program being checked".to_owned(),
                ]);

            let mut writer = BufferedStandardStream::stderr(if atty::is(atty::Stream::Stderr) {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            });
            let dummy_files = Files::new();

            default_hook(info);
            eprintln!();
            let _ =
                codespan_reporting::term::emit(&mut writer, &term_config, &dummy_files, &diagnostic);
            let _ = writer.flush();
        }));
    }

    /// Set to true if we should attempt to continue after encountering errors
    pub fn set_allow_errors(&mut self, allow_errors: bool) {
        self.allow_errors = allow_errors;
    }

    /// Set the writer to use when rendering diagnostics
    pub fn set_diagnostic_writer(&mut self, stream: impl 'static + WriteColor) {
        self.diagnostic_writer = RefCell::new(Box::new(stream) as Box<dyn WriteColor>);
    }

    /// Set the width to use when emitting terms
    pub fn set_emit_width(&mut self, emit_width: usize) {
        self.emit_width = emit_width;
    }

    /// Set the writer to use when emitting terms
    pub fn set_emit_writer(&mut self, stream: impl 'static + WriteColor) {
        self.emit_writer = RefCell::new(Box::new(stream) as Box<dyn WriteColor>);
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    /// Load a source string into the file database.
    pub fn load_source_string(&mut self, name: String, source: String) -> FileId {
        self.files.add(name, source)
    }

    /// Load a source file into the file database using a reader.
    pub fn load_source(&mut self, name: String, mut reader: impl Read) -> Option<FileId> {
        let mut source = String::new();
        match reader.read_to_string(&mut source) {
            Ok(_) => Some(self.load_source_string(name, source)),
            Err(error) => {
                self.emit_read_diagnostic(name, error);
                None
            }
        }
    }

    /// Load a source file into the file database from the given path.
    pub fn load_source_path(&mut self, path: &Path) -> Option<FileId> {
        match std::fs::File::open(path) {
            Ok(file) => self.load_source(path.display().to_string(), file),
            Err(error) => {
                self.emit_read_diagnostic(path.display(), error);
                None
            }
        }
    }

    /// Process the declarations of a program, committing each one before
    /// processing the next.
    pub fn check_program(&mut self, file_id: FileId) -> Status {
        let decls = match surface::parse_program(file_id, self.source(file_id)) {
            Ok(decls) => decls,
            Err(error) => {
                self.emit_diagnostic(error.to_diagnostic());
                return Status::Error;
            }
        };

        for decl in &decls {
            if let Err(error) = self.process_decl(file_id, decl) {
                self.emit_diagnostic(error.to_diagnostic());
                // Skip the rest of the program, unless `allow_errors` is enabled
                if !self.allow_errors {
                    break;
                }
            }
        }

        self.status()
    }

    /// Normalise a single expression, printing its normal form and type.
    pub fn normalise_and_emit_term(&mut self, file_id: FileId) -> Status {
        let result = surface::parse_term(file_id, self.source(file_id))
            .map_err(Error::from)
            .and_then(|term| self.check_and_emit(file_id, &term));

        if let Err(error) = result {
            self.emit_diagnostic(error.to_diagnostic());
        }

        self.status()
    }

    /// Run an interactive session, reading lines from `input` until it is
    /// exhausted or the user quits.
    pub fn repl(&mut self, mut input: impl BufRead) -> Status {
        self.emit_line(REPL_BANNER);
        self.emit_line("");

        let mut line = String::new();
        loop {
            self.emit_prompt();

            line.clear();
            match input.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(error) => {
                    self.emit_read_diagnostic("<stdin>", error);
                    break;
                }
            }

            match line.trim() {
                "" => {}
                ":quit" | ":q" => break,
                ":clear" | ":cls" => {
                    self.globals.clear();
                    self.emit_line("cleared the environment");
                }
                ":env" => self.emit_env(),
                ":help" | ":h" => self.emit_line(REPL_BANNER),
                input => {
                    let input = input.to_owned();
                    self.process_input(input);
                }
            }
        }

        Status::Ok
    }

    fn process_input(&mut self, input: String) {
        self.repl_inputs += 1;
        let name = format!("<repl:{}>", self.repl_inputs);
        let file_id = self.load_source_string(name, input);

        let decls = match surface::parse_input(file_id, self.source(file_id)) {
            Ok(decls) => decls,
            Err(error) => return self.emit_diagnostic(error.to_diagnostic()),
        };
        for decl in &decls {
            if let Err(error) = self.process_decl(file_id, decl) {
                return self.emit_diagnostic(error.to_diagnostic());
            }
        }
    }

    fn process_decl(&mut self, file_id: FileId, decl: &Decl) -> Result<(), Error> {
        tracing::debug!(range = ?decl.range(), "processing declaration");

        match decl {
            Decl::Axiom(_, names, r#type) => {
                let r#type = self.elaborate(file_id, r#type)?;
                let context = typing::Context::new(&self.globals);
                let r#type = context.check_type(&Checkable::Inf(r#type))?;
                let type_nf = context.quote(r#type.value());

                for (_, name) in names {
                    tracing::debug!(%name, "postulating global");
                    self.globals.postulate(*name, r#type.clone());
                }

                let names = names.iter().map(|(_, name)| name).format(", ");
                self.emit_doc(RcDoc::concat([
                    RcDoc::text(format!("postulated {names} :")),
                    RcDoc::line().append(self.term_doc(&type_nf)).nest(2),
                ]));
            }
            Decl::Defun(_, (_, name), expr) => {
                let expr = self.elaborate(file_id, expr)?;
                let context = typing::Context::new(&self.globals);
                let r#type = context.infer(&expr)?;
                let value = context.eval_inferable(&expr);
                let expr_nf = context.quote(&value);
                let type_nf = context.quote(r#type.value());

                tracing::debug!(%name, "defining global");
                self.globals.define(*name, value, r#type);

                self.emit_doc(RcDoc::concat([
                    RcDoc::text(format!("defined {name} =")),
                    RcDoc::line().append(self.typed_doc(&expr_nf, &type_nf)).nest(2),
                ]));
            }
            Decl::Check(_, expr) | Decl::Expr(expr) => self.check_and_emit(file_id, expr)?,
        }

        Ok(())
    }

    /// Infer the type of an expression, then print its normal form and type.
    fn check_and_emit(&self, file_id: FileId, expr: &Term) -> Result<(), Error> {
        let expr = self.elaborate(file_id, expr)?;
        let context = typing::Context::new(&self.globals);
        let r#type = context.infer(&expr)?;
        let expr_nf = context.quote(&context.eval_inferable(&expr));
        let type_nf = context.quote(r#type.value());

        self.emit_doc(self.typed_doc(&expr_nf, &type_nf));
        Ok(())
    }

    fn elaborate(&self, file_id: FileId, term: &Term) -> Result<Inferable, ElabError> {
        elaboration::Context::new(file_id, &self.registry).elaborate(term)
    }

    fn source(&self, file_id: FileId) -> &str {
        self.files.source(file_id).unwrap_or("")
    }

    fn status(&self) -> Status {
        match *self.seen_errors.borrow() {
            true => Status::Error,
            false => Status::Ok,
        }
    }

    fn term_doc(&self, term: &Checkable) -> RcDoc<'static> {
        core_pretty::Context::new().term(term)
    }

    fn typed_doc(&self, expr: &Checkable, r#type: &Checkable) -> RcDoc<'static> {
        RcDoc::concat([
            self.term_doc(expr),
            RcDoc::text(" :"),
            RcDoc::line().append(self.term_doc(r#type)).nest(2),
        ])
        .group()
    }

    fn emit_env(&self) {
        if self.globals.is_empty() {
            return self.emit_line("environment is empty");
        }

        let context = typing::Context::new(&self.globals);
        for (name, r#type) in self.globals.iter() {
            let keyword = match self.globals.is_axiom(name) {
                true => "axiom ",
                false => "",
            };
            let r#type = context.quote(r#type.value());
            self.emit_doc(RcDoc::concat([
                RcDoc::text(format!("{keyword}{name} :")),
                RcDoc::line().append(self.term_doc(&r#type)).nest(2),
            ]));
        }
    }

    fn emit_doc(&self, doc: RcDoc<'static>) {
        let mut emit_writer = self.emit_writer.borrow_mut();
        let doc = doc.group();
        let _ = writeln!(emit_writer, "{}", doc.pretty(self.emit_width))
            .and_then(|_| emit_writer.flush());
    }

    fn emit_line(&self, line: &str) {
        let mut emit_writer = self.emit_writer.borrow_mut();
        let _ = writeln!(emit_writer, "{line}").and_then(|_| emit_writer.flush());
    }

    fn emit_prompt(&self) {
        let mut emit_writer = self.emit_writer.borrow_mut();
        let _ = write!(emit_writer, "{REPL_PROMPT}").and_then(|_| emit_writer.flush());
    }

    fn emit_diagnostic(&self, diagnostic: Diagnostic<FileId>) {
        let mut writer = self.diagnostic_writer.borrow_mut();
        let config = &self.codespan_config;

        if let Err(error) = codespan_reporting::term::emit(&mut *writer, config, &self.files, &diagnostic) {
            tracing::error!(%error, "failed to emit diagnostic");
        }
        let _ = writer.flush();

        if diagnostic.severity >= Severity::Error {
            *self.seen_errors.borrow_mut() = true;
        }
    }

    fn emit_read_diagnostic(&self, name: impl std::fmt::Display, error: std::io::Error) {
        let diagnostic =
            Diagnostic::error().with_message(format!("couldn't read `{name}`: {error}"));
        self.emit_diagnostic(diagnostic);
    }
}

impl Default for Driver {
    fn default() -> Driver {
        Driver::new()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use codespan_reporting::term::termcolor::{Buffer, NoColor};

    use super::*;
    use crate::symbol::Symbol;

    /// A writer that can be inspected after being handed to the driver.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl std::io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    struct Session {
        driver: Driver,
        stdout: SharedBuffer,
        stderr: SharedBuffer,
    }

    fn new_session() -> Session {
        let stdout = SharedBuffer::default();
        let stderr = SharedBuffer::default();
        let mut driver = Driver::new();
        driver.set_emit_writer(NoColor::new(stdout.clone()));
        driver.set_diagnostic_writer(NoColor::new(stderr.clone()));
        driver.set_emit_width(80);

        Session {
            driver,
            stdout,
            stderr,
        }
    }

    const PROGRAM: &str = "\
axiom A : *
axiom a : A
defun id = (\\t x. x) : forall (t : *) -> t -> t
check id A a
";

    #[test]
    fn programs_are_processed_in_order() {
        let mut session = new_session();
        let file_id = session
            .driver
            .load_source_string("<test>".to_owned(), PROGRAM.to_owned());

        assert_eq!(session.driver.check_program(file_id), Status::Ok);
        assert_eq!(
            session.stdout.contents(),
            "\
postulated A : *
postulated a : A
defined id = λt x. x : forall (t : *) -> t -> t
a : A
",
        );
        assert_eq!(session.stderr.contents(), "");
    }

    #[test]
    fn errors_skip_the_rest_of_the_program() {
        let source = "axiom A : *\ncheck B\naxiom C : *\n";

        let mut session = new_session();
        let file_id = session
            .driver
            .load_source_string("<test>".to_owned(), source.to_owned());
        assert_eq!(session.driver.check_program(file_id), Status::Error);
        assert!(session.driver.globals().r#type(Symbol::intern("C")).is_none());
        assert!(session.stderr.contents().contains("Undefined variable identifier B"));

        let mut session = new_session();
        session.driver.set_allow_errors(true);
        let file_id = session
            .driver
            .load_source_string("<test>".to_owned(), source.to_owned());
        assert_eq!(session.driver.check_program(file_id), Status::Error);
        assert!(session.driver.globals().r#type(Symbol::intern("C")).is_some());
    }

    #[test]
    fn repl_commands() {
        let input = "\
:env
axiom A : *

defun f = (\\x. x) : A -> A
:env
f
:clear
:env
:q
check A
";

        let mut session = new_session();
        assert_eq!(session.driver.repl(input.as_bytes()), Status::Ok);

        let stdout = session.stdout.contents();
        let stdout = stdout.strip_prefix(REPL_BANNER).unwrap();
        assert_eq!(
            stdout,
            format!(
                "\n\n{p}environment is empty\n\
                 {p}postulated A : *\n\
                 {p}{p}defined f = λx. x : A -> A\n\
                 {p}axiom A : *\nf : A -> A\n\
                 {p}λx. x : A -> A\n\
                 {p}cleared the environment\n\
                 {p}environment is empty\n\
                 {p}",
                p = REPL_PROMPT,
            ),
        );
        assert_eq!(session.stderr.contents(), "");
    }

    #[test]
    fn repl_errors_point_into_the_input() {
        let mut session = new_session();
        session.driver.repl("check x\nx x\n".as_bytes());

        let stderr = session.stderr.contents();
        assert!(stderr.contains("<repl:1>"));
        assert!(stderr.contains("<repl:2>"));
        assert_eq!(stderr.matches("error: Undefined variable identifier x").count(), 2);
    }

    #[test]
    fn normalising_a_term() {
        let mut session = new_session();
        let file_id = session.driver.load_source_string(
            "<term>".to_owned(),
            r"natElim (\n. Nat) 2 (\n r. Succ r) 3".to_owned(),
        );

        assert_eq!(session.driver.normalise_and_emit_term(file_id), Status::Ok);
        assert_eq!(session.stdout.contents(), "5 : Nat\n");
    }

    fn check_source(source: &str) -> (Status, String, String) {
        let mut session = new_session();
        let file_id = session
            .driver
            .load_source_string("<test>".to_owned(), source.to_owned());
        let status = session.driver.check_program(file_id);

        (status, session.stdout.contents(), session.stderr.contents())
    }

    #[test]
    fn binders_are_renamed_around_globals() {
        let (status, stdout, _) = check_source(
            "axiom A : *\ndefun k = (\\x A. x) : * -> * -> *\ncheck k A\n",
        );

        assert_eq!(status, Status::Ok);
        assert_eq!(
            stdout,
            "\
postulated A : *
defined k = λx A. x : * -> * -> *
λA'. A : * -> *
",
        );
    }

    #[test]
    fn largest_number_literal() {
        // Run with the stack size of the main thread of the binary
        let output = std::thread::Builder::new()
            .stack_size(8 * 1024 * 1024)
            .spawn(|| check_source("check 1000\ncheck natElim (\\n. Nat) 1000 (\\n r. Succ r) 0\n"))
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(output, (Status::Ok, "1000 : Nat\n1000 : Nat\n".to_owned(), String::new()));
    }

    #[test]
    fn number_literals_above_the_limit() {
        let (status, stdout, stderr) = check_source("check 1001\n");

        assert_eq!(status, Status::Error);
        assert_eq!(stdout, "");
        assert!(stderr.starts_with("error: number literal is too large"));
        assert!(stderr.contains("= the largest number literal is 1000"));
    }

    #[test]
    fn diagnostics_without_colour() {
        let mut buffer = Buffer::no_color();
        let diagnostic = Error::from(ElabError::LamNotInferable {
            span: crate::source::Span::Empty,
        })
        .to_diagnostic();
        codespan_reporting::term::emit(
            &mut buffer,
            &codespan_reporting::term::Config::default(),
            &Files::new(),
            &diagnostic,
        )
        .unwrap();

        let output = String::from_utf8(buffer.into_inner()).unwrap();
        assert!(output.starts_with("error: cannot infer the type of a function literal"));
    }
}
