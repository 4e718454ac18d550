use std::path::PathBuf;
use std::time::Duration;

use iced::widget::{
    button, column, container, pick_list, progress_bar, row, scrollable, slider, text, Space,
};
use iced::{Element, Length, Subscription, Task};

use srtforge_core::job::config::JobConfig;
use srtforge_core::job::coordinator::{self, JobHandle};
use srtforge_core::job::messages::JobStatus;
use srtforge_core::progress::ProgressSample;
use srtforge_core::recognition::domain::model::ModelId;
use srtforge_core::shared::constants::{AUDIO_EXTENSIONS, VIDEO_EXTENSIONS};

use crate::settings::Settings;

/// Poll cadence for draining worker channels while a job runs.
const TICK: Duration = Duration::from_millis(100);

/// The log view keeps a bounded tail; jobs over long batches can produce a
/// lot of lines.
const MAX_LOG_LINES: usize = 500;

#[derive(Debug, Clone)]
pub enum Message {
    SelectFiles,
    FilesSelected(Option<Vec<PathBuf>>),
    ClearFiles,
    ModelChanged(ModelId),
    MaxCharsChanged(u32),
    Start,
    Stop,
    Tick,
    OpenOutputFolder,
}

pub struct App {
    settings: Settings,
    files: Vec<PathBuf>,
    job: Option<JobHandle>,
    status: JobStatus,
    progress: Option<ProgressSample>,
    log: Vec<String>,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        (
            Self {
                settings: Settings::load(),
                files: Vec::new(),
                job: None,
                status: JobStatus::Idle,
                progress: None,
                log: Vec::new(),
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::SelectFiles => {
                let extensions: Vec<&str> = AUDIO_EXTENSIONS
                    .iter()
                    .chain(VIDEO_EXTENSIONS.iter())
                    .copied()
                    .collect();
                return Task::perform(
                    async move {
                        rfd::AsyncFileDialog::new()
                            .set_title("Select audio or video files")
                            .add_filter("Media Files", &extensions)
                            .pick_files()
                            .await
                            .map(|handles| {
                                handles.iter().map(|h| h.path().to_path_buf()).collect()
                            })
                    },
                    Message::FilesSelected,
                );
            }
            Message::FilesSelected(Some(paths)) => {
                for path in paths {
                    if !self.files.contains(&path) {
                        self.files.push(path);
                    }
                }
            }
            Message::FilesSelected(None) => {}
            Message::ClearFiles => {
                if self.job.is_none() {
                    self.files.clear();
                }
            }
            Message::ModelChanged(model) => {
                self.settings.model = model;
                self.settings.save();
            }
            Message::MaxCharsChanged(value) => {
                self.settings.max_chars = value;
                self.settings.save();
            }
            Message::Start => {
                if self.job.is_some() || self.files.is_empty() {
                    return Task::none();
                }
                let config = JobConfig::new(
                    self.settings.model,
                    self.settings.max_chars as usize,
                    self.files.clone(),
                );
                self.log.clear();
                self.progress = None;
                match coordinator::submit(&config) {
                    Ok(handle) => {
                        self.job = Some(handle);
                        self.status = JobStatus::Loading;
                    }
                    Err(err) => {
                        log::error!("Failed to start worker: {err}");
                        self.status = JobStatus::Error {
                            message: err.to_string(),
                        };
                    }
                }
            }
            Message::Stop => {
                if let Some(mut job) = self.job.take() {
                    job.cancel();
                    self.status = JobStatus::Cancelled;
                    self.progress = None;
                }
            }
            Message::Tick => {
                let Some(job) = self.job.as_mut() else {
                    return Task::none();
                };
                let alive = job.is_alive();
                drain(job, &mut self.log, &mut self.progress, &mut self.status);
                if !alive {
                    if let Some(mut job) = self.job.take() {
                        // Reap and join the pump so every buffered line is in
                        // the channels, then take the stragglers.
                        job.cancel();
                        drain(&job, &mut self.log, &mut self.progress, &mut self.status);
                    }
                    // A worker that died without a terminal status crashed.
                    if !self.status.is_terminal() {
                        self.status = JobStatus::Error {
                            message: "worker exited unexpectedly".to_string(),
                        };
                    }
                }
            }
            Message::OpenOutputFolder => {
                if let Some(dir) = self.files.first().and_then(|f| f.parent()) {
                    let _ = open::that(dir);
                }
            }
        }
        Task::none()
    }

    pub fn view(&self) -> Element<'_, Message> {
        let running = self.job.is_some();

        let model_picker = row![
            text("Model").size(13),
            pick_list(ModelId::ALL, Some(self.settings.model), Message::ModelChanged)
                .text_size(13),
        ]
        .spacing(8)
        .align_y(iced::Alignment::Center);

        let max_chars_control = row![
            text(format!("Max chars: {}", self.settings.max_chars)).size(13),
            slider(10..=100u32, self.settings.max_chars, Message::MaxCharsChanged)
                .width(Length::Fixed(160.0)),
        ]
        .spacing(8)
        .align_y(iced::Alignment::Center);

        let controls = row![
            model_picker,
            Space::new().width(Length::Fill),
            max_chars_control,
        ]
        .align_y(iced::Alignment::Center);

        let file_buttons = row![
            button(text("Add Files\u{2026}").size(13)).on_press(Message::SelectFiles),
            button(text("Clear").size(13))
                .on_press(Message::ClearFiles)
                .style(button::secondary),
        ]
        .spacing(8);

        let file_list: Element<'_, Message> = if self.files.is_empty() {
            text("No files selected").size(13).into()
        } else {
            column(
                self.files
                    .iter()
                    .map(|f| text(file_label(f)).size(13).into())
                    .collect::<Vec<_>>(),
            )
            .spacing(2)
            .into()
        };

        let run_button: Element<'_, Message> = if running {
            button(text("Stop").size(14))
                .on_press(Message::Stop)
                .style(button::danger)
                .padding([8, 24])
                .into()
        } else {
            let mut start = button(text("Create Subtitles").size(14)).padding([8, 24]);
            if !self.files.is_empty() {
                start = start.on_press(Message::Start);
            }
            start.into()
        };

        let pct = self
            .progress
            .and_then(|p| p.percent())
            .map(|pct| pct as f32)
            .unwrap_or(0.0);

        let mut footer = row![text(self.status.to_string()).size(13)]
            .spacing(8)
            .align_y(iced::Alignment::Center);
        if self.status == JobStatus::Finished {
            footer = footer.push(
                button(text("Open Folder").size(13))
                    .on_press(Message::OpenOutputFolder)
                    .style(button::text),
            );
        }

        let log_view = container(
            scrollable(
                column(
                    self.log
                        .iter()
                        .map(|line| text(line).size(12).into())
                        .collect::<Vec<_>>(),
                )
                .spacing(1),
            )
            .height(Length::Fill)
            .anchor_bottom(),
        )
        .padding(8)
        .height(Length::Fill)
        .width(Length::Fill);

        column![
            controls,
            file_buttons,
            scrollable(file_list).height(Length::Fixed(110.0)),
            run_button,
            progress_bar(0.0..=100.0, pct),
            footer,
            log_view,
        ]
        .spacing(12)
        .padding(16)
        .into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        if self.job.is_some() {
            iced::time::every(TICK).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }
}

/// Move everything currently buffered in the worker channels into app state.
fn drain(
    job: &JobHandle,
    log: &mut Vec<String>,
    progress: &mut Option<ProgressSample>,
    status: &mut JobStatus,
) {
    for line in job.logs().try_iter() {
        log.push(line);
    }
    if log.len() > MAX_LOG_LINES {
        let excess = log.len() - MAX_LOG_LINES;
        log.drain(..excess);
    }
    if let Some(sample) = job.progress().try_iter().last() {
        *progress = Some(sample);
    }
    if let Some(latest) = job.status().try_iter().last() {
        *status = latest;
    }
}

fn file_label(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
