// UI layer: turns an `Invocation` into prompts, a credential decision and
// an upload. Prompts go through the `Prompt` trait (dialoguer in the real
// binary) and uploads through `Uploader`, so the whole flow can be driven
// from tests.

use dialoguer::Confirm;
use tracing::{debug, info};

use crate::api::Uploader;
use crate::cli::{CredentialFlag, Invocation};
use crate::credential::CredentialStore;
use crate::error::CliError;
use crate::progress::ProgressTracker;
use crate::request::UploadRequest;
use crate::target::UploadTarget;

/// Yes/no questions asked during an upload.
pub trait Prompt {
    fn confirm(&self, message: &str) -> std::io::Result<bool>;
}

/// Asks on the terminal with `dialoguer`.
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> std::io::Result<bool> {
        Confirm::new().with_prompt(message).default(false).interact()
    }
}

/// What to do about the userhash before a Catbox upload starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialDecision {
    /// `--anon`: send nothing.
    Anonymous,
    /// `--userhash` given. `offer_save` is set when nothing is saved yet.
    Provided { token: String, offer_save: bool },
    /// Fall back to the saved userhash.
    Stored(String),
    /// Nothing given or saved; ask whether to upload anonymously.
    AskAnonymous,
}

/// Decide how the userhash is resolved from the flags and the saved value.
/// Pure: no prompts, no file access.
pub fn resolve_credential(flag: &CredentialFlag, stored: Option<&str>) -> CredentialDecision {
    let stored = stored.filter(|s| !s.is_empty());
    match flag {
        CredentialFlag::Anonymous => CredentialDecision::Anonymous,
        CredentialFlag::Explicit(token) if !token.is_empty() => CredentialDecision::Provided {
            token: token.clone(),
            offer_save: stored.is_none(),
        },
        CredentialFlag::Explicit(_) | CredentialFlag::Default => match stored {
            Some(token) => CredentialDecision::Stored(token.to_string()),
            None => CredentialDecision::AskAnonymous,
        },
    }
}

/// How a run ended when it didn't fail. All of these exit with 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    HelpShown,
    CredentialSaved,
    /// The user declined an anonymous upload.
    Cancelled,
    Uploaded { file_name: String, url: String },
}

enum Resolved {
    /// Upload with this userhash, or anonymously.
    Send(Option<String>),
    Cancelled,
}

pub struct App<U, P> {
    uploader: U,
    prompt: P,
    store: CredentialStore,
    show_progress: bool,
}

impl<U: Uploader, P: Prompt> App<U, P> {
    pub fn new(uploader: U, prompt: P, store: CredentialStore) -> Self {
        App {
            uploader,
            prompt,
            store,
            show_progress: true,
        }
    }

    /// Count progress without drawing it.
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn run(&self, invocation: Invocation) -> Result<Outcome, CliError> {
        match invocation {
            Invocation::Help(text) => {
                print!("{text}");
                Ok(Outcome::HelpShown)
            }
            Invocation::SaveCredential(token) => {
                self.store.save(&token)?;
                println!("Userhash \"{token}\" saved as default.");
                Ok(Outcome::CredentialSaved)
            }
            Invocation::Upload {
                file,
                target,
                credential,
            } => {
                // size and existence are checked before anything is asked
                let request = UploadRequest::new(target, file)?;
                let stored = self.store.load()?;
                let token = match target {
                    UploadTarget::Permanent => {
                        match self.credential_for(&credential, stored.as_deref())? {
                            Resolved::Send(token) => token,
                            Resolved::Cancelled => return Ok(Outcome::Cancelled),
                        }
                    }
                    UploadTarget::Temporary(_) => None,
                };
                self.upload(request.with_credential(token))
            }
        }
    }

    fn credential_for(
        &self,
        flag: &CredentialFlag,
        stored: Option<&str>,
    ) -> Result<Resolved, CliError> {
        let decision = resolve_credential(flag, stored);
        debug!(?decision, "credential resolved");

        match decision {
            CredentialDecision::Anonymous => Ok(Resolved::Send(None)),
            CredentialDecision::Stored(token) => Ok(Resolved::Send(Some(token))),
            CredentialDecision::Provided { token, offer_save } => {
                if offer_save {
                    let question = format!(
                        "No default userhash. Would you like to set the inputted userhash \
                         \"{token}\" as default for future uploads?"
                    );
                    if self.prompt.confirm(&question).map_err(CliError::Prompt)? {
                        self.store.save(&token)?;
                        println!("Userhash \"{token}\" saved as default.");
                    } else {
                        println!("Userhash \"{token}\" not saved.");
                    }
                }
                Ok(Resolved::Send(Some(token)))
            }
            CredentialDecision::AskAnonymous => {
                let question = "No userhash inputted. Would you like to upload anyways?";
                if self.prompt.confirm(question).map_err(CliError::Prompt)? {
                    println!("Uploading anonymously.");
                    Ok(Resolved::Send(None))
                } else {
                    println!(
                        "Upload cancelled. You may set a default userhash by uploading again \
                         using --userhash followed by your userhash."
                    );
                    Ok(Resolved::Cancelled)
                }
            }
        }
    }

    fn upload(&self, request: UploadRequest) -> Result<Outcome, CliError> {
        let label = request.target.status_label();
        let tracker = if self.show_progress {
            ProgressTracker::new(&request.file_name, label)
        } else {
            ProgressTracker::hidden(&request.file_name, label)
        };

        match self.uploader.upload(&request, &tracker) {
            Ok(url) => {
                tracker.finish();
                info!(file = %request.file_name, %url, "upload finished");
                println!("Uploaded \"{}\" successfully! URL: {url}", request.file_name);
                Ok(Outcome::Uploaded {
                    file_name: request.file_name,
                    url,
                })
            }
            Err(err) => {
                // leaves the partial line; the error goes on the next one
                tracker.abandon();
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use crate::target::Ttl;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::io::Write;
    use std::path::PathBuf;

    #[derive(Default)]
    struct FakeUploader {
        calls: RefCell<Vec<UploadRequest>>,
        fail: bool,
    }

    impl Uploader for &FakeUploader {
        fn upload(
            &self,
            request: &UploadRequest,
            tracker: &ProgressTracker,
        ) -> Result<String, UploadError> {
            self.calls.borrow_mut().push(request.clone());
            if self.fail {
                return Err(UploadError::TooLarge {
                    size: 0,
                    limit: 0,
                    service: "test",
                });
            }
            let _sampling = tracker.start(request.file_size);
            tracker.on_bytes(request.file_size as usize);
            Ok(format!("https://files.example/{}", request.file_name))
        }
    }

    /// Answers queued in order; panics if asked more than expected.
    struct ScriptedPrompt {
        answers: RefCell<VecDeque<bool>>,
        asked: Cell<usize>,
    }

    impl ScriptedPrompt {
        fn new(answers: &[bool]) -> Self {
            ScriptedPrompt {
                answers: RefCell::new(answers.iter().copied().collect()),
                asked: Cell::new(0),
            }
        }
    }

    impl Prompt for &ScriptedPrompt {
        fn confirm(&self, message: &str) -> std::io::Result<bool> {
            self.asked.set(self.asked.get() + 1);
            Ok(self
                .answers
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected prompt: {message}")))
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        uploader: FakeUploader,
        prompt: ScriptedPrompt,
    }

    impl Fixture {
        fn new(answers: &[bool]) -> Self {
            Fixture {
                dir: tempfile::tempdir().unwrap(),
                uploader: FakeUploader::default(),
                prompt: ScriptedPrompt::new(answers),
            }
        }

        fn store(&self) -> CredentialStore {
            CredentialStore::new(self.dir.path().join(".userhash"))
        }

        fn app(&self) -> App<&FakeUploader, &ScriptedPrompt> {
            App::new(&self.uploader, &self.prompt, self.store()).quiet()
        }

        fn file(&self, name: &str, len: usize) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::File::create(&path)
                .unwrap()
                .write_all(&vec![0u8; len])
                .unwrap();
            path
        }

        fn upload(
            &self,
            file: PathBuf,
            target: UploadTarget,
            credential: CredentialFlag,
        ) -> Result<Outcome, CliError> {
            self.app().run(Invocation::Upload {
                file,
                target,
                credential,
            })
        }
    }

    #[test]
    fn decision_table() {
        use CredentialDecision::*;
        let explicit = CredentialFlag::Explicit("new".into());

        assert_eq!(
            resolve_credential(&CredentialFlag::Anonymous, Some("saved")),
            Anonymous
        );
        assert_eq!(
            resolve_credential(&explicit, None),
            Provided {
                token: "new".into(),
                offer_save: true,
            }
        );
        assert_eq!(
            resolve_credential(&explicit, Some("saved")),
            Provided {
                token: "new".into(),
                offer_save: false,
            }
        );
        assert_eq!(
            resolve_credential(&CredentialFlag::Default, Some("saved")),
            Stored("saved".into())
        );
        assert_eq!(
            resolve_credential(&CredentialFlag::Default, None),
            AskAnonymous
        );
        assert_eq!(
            resolve_credential(&CredentialFlag::Default, Some("")),
            AskAnonymous
        );
    }

    #[test]
    fn stored_userhash_is_sent() {
        let fx = Fixture::new(&[]);
        fx.store().save("abc123").unwrap();
        let file = fx.file("photo.png", 1024);

        let outcome = fx
            .upload(file, UploadTarget::Permanent, CredentialFlag::Default)
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Uploaded {
                file_name: "photo.png".into(),
                url: "https://files.example/photo.png".into(),
            }
        );
        let calls = fx.uploader.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].credential.as_deref(), Some("abc123"));
        assert_eq!(calls[0].file_size, 1024);
        assert_eq!(fx.prompt.asked.get(), 0);
    }

    #[test]
    fn oversized_file_never_reaches_the_uploader() {
        let fx = Fixture::new(&[]);
        let path = fx.dir.path().join("big.iso");
        std::fs::File::create(&path)
            .unwrap()
            .set_len(2_147_483_648)
            .unwrap();

        let target = UploadTarget::Temporary(Ttl::OneDay);
        let err = fx
            .upload(path, target, CredentialFlag::Default)
            .unwrap_err();
        assert!(matches!(err, CliError::SizeLimitExceeded { .. }));
        assert_eq!(err.exit_code(), 1);
        assert!(fx.uploader.calls.borrow().is_empty());
    }

    #[test]
    fn missing_file_is_reported_before_prompting() {
        let fx = Fixture::new(&[]);
        let missing = fx.dir.path().join("gone.png");
        let err = fx
            .upload(missing, UploadTarget::Permanent, CredentialFlag::Default)
            .unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
        assert_eq!(fx.prompt.asked.get(), 0);
    }

    #[test]
    fn declining_anonymous_upload_cancels() {
        let fx = Fixture::new(&[false]);
        let file = fx.file("photo.png", 10);
        let outcome = fx
            .upload(file, UploadTarget::Permanent, CredentialFlag::Default)
            .unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
        assert!(fx.uploader.calls.borrow().is_empty());
    }

    #[test]
    fn accepting_anonymous_upload_sends_no_userhash() {
        let fx = Fixture::new(&[true]);
        let file = fx.file("photo.png", 10);
        fx.upload(file, UploadTarget::Permanent, CredentialFlag::Default)
            .unwrap();
        assert_eq!(fx.uploader.calls.borrow()[0].credential, None);
    }

    #[test]
    fn anon_flag_skips_the_saved_userhash() {
        let fx = Fixture::new(&[]);
        fx.store().save("abc123").unwrap();
        let file = fx.file("photo.png", 10);
        fx.upload(file, UploadTarget::Permanent, CredentialFlag::Anonymous)
            .unwrap();
        assert_eq!(fx.uploader.calls.borrow()[0].credential, None);
        assert_eq!(fx.prompt.asked.get(), 0);
    }

    #[test]
    fn explicit_userhash_offered_for_saving() {
        let fx = Fixture::new(&[true]);
        let file = fx.file("photo.png", 10);
        fx.upload(file, UploadTarget::Permanent, CredentialFlag::Explicit("new".into()))
            .unwrap();
        assert_eq!(fx.store().load().unwrap().as_deref(), Some("new"));
        assert_eq!(fx.uploader.calls.borrow()[0].credential.as_deref(), Some("new"));
    }

    #[test]
    fn explicit_userhash_not_saved_when_declined() {
        let fx = Fixture::new(&[false]);
        let file = fx.file("photo.png", 10);
        fx.upload(file, UploadTarget::Permanent, CredentialFlag::Explicit("new".into()))
            .unwrap();
        assert_eq!(fx.store().load().unwrap(), None);
        assert_eq!(fx.uploader.calls.borrow()[0].credential.as_deref(), Some("new"));
    }

    #[test]
    fn explicit_userhash_overrides_saved_without_asking() {
        let fx = Fixture::new(&[]);
        fx.store().save("old").unwrap();
        let file = fx.file("photo.png", 10);
        fx.upload(file, UploadTarget::Permanent, CredentialFlag::Explicit("new".into()))
            .unwrap();
        assert_eq!(fx.store().load().unwrap().as_deref(), Some("old"));
        assert_eq!(fx.uploader.calls.borrow()[0].credential.as_deref(), Some("new"));
    }

    #[test]
    fn litterbox_ignores_userhash_and_never_prompts() {
        let fx = Fixture::new(&[]);
        fx.store().save("abc123").unwrap();
        let file = fx.file("notes.txt", 10);
        fx.upload(file, UploadTarget::Temporary(Ttl::OneHour), CredentialFlag::Default)
            .unwrap();
        assert_eq!(fx.uploader.calls.borrow()[0].credential, None);
        assert_eq!(fx.prompt.asked.get(), 0);
    }

    #[test]
    fn litterbox_upload_still_creates_the_userhash_file() {
        let fx = Fixture::new(&[]);
        let file = fx.file("notes.txt", 10);
        assert!(!fx.store().path().exists());

        fx.upload(file, UploadTarget::Temporary(Ttl::OneDay), CredentialFlag::Default)
            .unwrap();
        assert!(fx.store().path().exists());
        assert_eq!(fx.store().load().unwrap(), None);
    }

    #[test]
    fn help_invocation_is_shown_not_uploaded() {
        let fx = Fixture::new(&[]);
        let outcome = fx
            .app()
            .run(Invocation::Help("Usage: catbox <FILE>\n".into()))
            .unwrap();
        assert_eq!(outcome, Outcome::HelpShown);
        assert!(fx.uploader.calls.borrow().is_empty());
        assert_eq!(fx.prompt.asked.get(), 0);
    }

    #[test]
    fn save_credential_invocation() {
        let fx = Fixture::new(&[]);
        let outcome = fx
            .app()
            .run(Invocation::SaveCredential("abc123".into()))
            .unwrap();
        assert_eq!(outcome, Outcome::CredentialSaved);
        assert_eq!(fx.store().load().unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn upload_failure_becomes_cli_error() {
        let mut fx = Fixture::new(&[]);
        fx.uploader.fail = true;
        fx.store().save("abc123").unwrap();
        let file = fx.file("photo.png", 10);
        let err = fx
            .upload(file, UploadTarget::Permanent, CredentialFlag::Default)
            .unwrap_err();
        assert!(matches!(err, CliError::Upload(_)));
        assert_eq!(err.exit_code(), 1);
    }
}
