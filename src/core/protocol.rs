//! Line protocol spoken between a peer and the tracker.
//!
//! Every request and every response is a single `\n`-terminated line. Requests
//! are whitespace-tokenised, token 0 being the command name. Listing responses
//! carry a prefix (`list-files:` / `list-users:`) followed by `;`-terminated
//! entries; everything else is free text.

use std::fmt;

use crate::utils::{Result, ShareError};

pub const LIST_FILES_PREFIX: &str = "list-files:";
pub const LIST_USERS_PREFIX: &str = "list-users:";

const FILE_ENTRY_SEPARATOR: &str = " : ";
const USER_ENTRY_SEPARATOR: &str = " - ";

const COMMAND_LIST: &str = "list-files;\
    list-users;\
    download user \"path to file on user\" \"path to save\";\
    register user \"file1\" \"file2\" ... \"fileN\";\
    unregister user \"file1\" \"file2\" ... \"fileN\";\
    disconnect;";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    RegisterMiniserver { address: String },
    Register { user: String, files: Vec<String> },
    Unregister { user: String, files: Vec<String> },
    ListFiles,
    ListUsers,
    Disconnect,
}

impl Request {
    /// Parses one command line. Missing arguments never panic; they surface as
    /// `MalformedCommand` so the handler can answer and keep the connection.
    pub fn parse(line: &str) -> Result<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = tokens.split_first() else {
            return Err(ShareError::UnknownCommand(String::new()));
        };

        match command {
            "register-miniserver" => match args.first() {
                Some(address) => Ok(Request::RegisterMiniserver {
                    address: address.to_string(),
                }),
                None => Err(ShareError::MalformedCommand(
                    "register-miniserver expects <address>".to_string(),
                )),
            },
            "register" | "unregister" => {
                let (user, files) = args.split_first().ok_or_else(|| {
                    ShareError::MalformedCommand(format!(
                        "{} expects <user> \"file\"...",
                        command
                    ))
                })?;
                let user = user.to_string();
                let files = strip_quotes(files);

                if command == "register" {
                    Ok(Request::Register { user, files })
                } else {
                    Ok(Request::Unregister { user, files })
                }
            }
            "list-files" => Ok(Request::ListFiles),
            "list-users" => Ok(Request::ListUsers),
            "disconnect" => Ok(Request::Disconnect),
            other => Err(ShareError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::RegisterMiniserver { address } => write!(f, "register-miniserver {}", address),
            Request::Register { user, files } => write_file_command(f, "register", user, files),
            Request::Unregister { user, files } => write_file_command(f, "unregister", user, files),
            Request::ListFiles => write!(f, "list-files"),
            Request::ListUsers => write!(f, "list-users"),
            Request::Disconnect => write!(f, "disconnect"),
        }
    }
}

fn write_file_command(
    f: &mut fmt::Formatter<'_>,
    command: &str,
    user: &str,
    files: &[String],
) -> fmt::Result {
    write!(f, "{} {}", command, user)?;
    for file in files {
        write!(f, " \"{}\"", file)?;
    }
    Ok(())
}

fn strip_quotes(tokens: &[&str]) -> Vec<String> {
    tokens
        .iter()
        .map(|token| token.replace('"', ""))
        .filter(|token| !token.is_empty())
        .collect()
}

/// One line written by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    MiniserverRegistered,
    FilesRegistered,
    FilesUnregistered,
    /// (username, path) pairs.
    Files(Vec<(String, String)>),
    /// (username, transfer address) pairs.
    Users(Vec<(String, String)>),
    Usage,
    Error(String),
}

impl From<ShareError> for Response {
    fn from(err: ShareError) -> Self {
        match err {
            ShareError::UnknownCommand(_) => Response::Usage,
            other => Response::Error(other.to_string()),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::MiniserverRegistered => write!(f, "Successfully registered miniServerAddress."),
            Response::FilesRegistered => write!(f, "Successfully registered files."),
            Response::FilesUnregistered => write!(f, "Successfully unregistered files."),
            Response::Files(entries) => {
                write!(f, "{}", LIST_FILES_PREFIX)?;
                for (user, path) in entries {
                    write!(f, "{}{}{};", user, FILE_ENTRY_SEPARATOR, path)?;
                }
                Ok(())
            }
            Response::Users(entries) => {
                write!(f, "{}", LIST_USERS_PREFIX)?;
                for (user, address) in entries {
                    write!(f, "{}{}{};", user, USER_ENTRY_SEPARATOR, address)?;
                }
                Ok(())
            }
            Response::Usage => write!(f, "Wrong command. Choose between:;{}", COMMAND_LIST),
            Response::Error(message) => write!(f, "{}", message),
        }
    }
}

/// A tracker line as classified by the peer's response reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerReply {
    Users(Vec<(String, String)>),
    Files(Vec<(String, String)>),
    Text(String),
}

impl TrackerReply {
    pub fn parse(line: &str) -> Self {
        if let Some(rest) = line.strip_prefix(LIST_USERS_PREFIX) {
            TrackerReply::Users(parse_entries(rest, USER_ENTRY_SEPARATOR))
        } else if let Some(rest) = line.strip_prefix(LIST_FILES_PREFIX) {
            TrackerReply::Files(parse_entries(rest, FILE_ENTRY_SEPARATOR))
        } else {
            TrackerReply::Text(line.to_string())
        }
    }
}

fn parse_entries(body: &str, separator: &str) -> Vec<(String, String)> {
    body.split(';')
        .filter_map(|entry| entry.split_once(separator))
        .map(|(left, right)| (left.trim().to_string(), right.trim().to_string()))
        .filter(|(left, right)| !left.is_empty() && !right.is_empty())
        .collect()
}

/// Splits a console line into arguments, keeping double-quoted segments
/// (which may contain spaces) together and dropping the quotes.
pub fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        args.push(current);
    }
    args
}
