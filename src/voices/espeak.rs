//! Offline speech with espeak-ng, converted to MP3 by the encoder.

#![allow(non_upper_case_globals)]

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use super::Synthesizer;
use crate::encoder::Encoder;

pub struct Espeak {
    voice: String,
    encoder: Arc<dyn Encoder>,
}

impl Espeak {
    pub fn new(voice: &str, encoder: Arc<dyn Encoder>) -> Self {
        Self {
            voice: voice.to_string(),
            encoder,
        }
    }
}

fn write_wav(path: &Path, spoken: &ffi::Spoken) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: spoken.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in &spoken.wav {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;

    Ok(())
}

#[async_trait]
impl Synthesizer for Espeak {
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<()> {
        let wav_path = dest.with_extension("wav");

        let text = text.to_string();
        let voice = self.voice.clone();
        let target = wav_path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let spoken = ffi::speak(&text, &voice)?;
            write_wav(&target, &spoken)
        })
        .await
        .context("espeak task panicked")??;

        let converted = self.encoder.wav_to_mp3(&wav_path, dest).await;
        let _ = tokio::fs::remove_file(&wav_path).await;
        converted
    }
}

mod ffi {
    use super::*;
    use espeakng_sys::*;
    use lazy_static::lazy_static;
    use std::cell::Cell;
    use std::ffi::{c_void, CString};
    use std::os::raw::{c_char, c_int, c_short};
    use std::sync::{Mutex, MutexGuard};

    const BUFF_LEN: i32 = 500;
    const OPTIONS: i32 = 0;

    lazy_static! {
        // espeak-ng keeps global state, one synthesis at a time
        static ref ENGINE: Mutex<()> = Mutex::new(());
        static ref AUDIO_RETURN: Mutex<Cell<Vec<i16>>> = Mutex::new(Cell::new(Vec::default()));
        static ref AUDIO_BUFFER: Mutex<Cell<Vec<i16>>> = Mutex::new(Cell::new(Vec::default()));
    }

    pub struct Spoken {
        pub wav: Vec<i16>,
        pub sample_rate: u32,
    }

    pub fn speak(text: &str, voice: &str) -> Result<Spoken> {
        let _engine = ENGINE.plock();

        AUDIO_RETURN.plock().set(Vec::default());
        AUDIO_BUFFER.plock().set(Vec::default());

        let voice_cstr = CString::new(voice).context("Voice name contains a null byte")?;
        let filtered_text: String = text.chars().filter(|&c| c != '\0').collect();
        let text_cstr = CString::new(filtered_text).context("Text contains a null byte")?;

        let path: *const c_char = std::ptr::null();
        let sample_rate = unsafe {
            espeak_Initialize(
                espeak_AUDIO_OUTPUT_AUDIO_OUTPUT_RETRIEVAL,
                BUFF_LEN,
                path,
                OPTIONS,
            )
        };
        if sample_rate <= 0 {
            return Err(anyhow!("espeak-ng failed to initialize"));
        }

        unsafe {
            espeak_SetVoiceByName(voice_cstr.as_ptr());
            espeak_SetSynthCallback(Some(synth_callback));
            espeak_Synth(
                text_cstr.as_ptr() as *const c_void,
                BUFF_LEN as usize,
                0,
                0,
                0,
                espeakCHARS_AUTO,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            );
        }

        let status = unsafe { espeak_Synchronize() };
        let wav = AUDIO_RETURN.plock().take();
        unsafe {
            espeak_Terminate();
        }

        if status != espeak_ERROR_EE_OK {
            return Err(anyhow!("espeak-ng synthesis failed with status {status}"));
        }

        Ok(Spoken {
            wav,
            sample_rate: sample_rate as u32,
        })
    }

    unsafe extern "C" fn synth_callback(
        wav: *mut c_short,
        sample_count: c_int,
        events: *mut espeak_EVENT,
    ) -> c_int {
        let mut finished = false;
        let mut event = events;
        while (*event).type_ != espeak_EVENT_TYPE_espeakEVENT_LIST_TERMINATED {
            if (*event).type_ == espeak_EVENT_TYPE_espeakEVENT_MSG_TERMINATED {
                finished = true;
            }
            event = event.add(1);
        }

        if finished {
            AUDIO_RETURN.plock().set(AUDIO_BUFFER.plock().take());
        } else if sample_count > 0 && !wav.is_null() {
            let samples = std::slice::from_raw_parts(wav, sample_count as usize);
            let mut pending = AUDIO_BUFFER.plock().take();
            pending.extend_from_slice(samples);
            AUDIO_BUFFER.plock().set(pending);
        }

        0
    }

    trait PoisonlessLock<T> {
        fn plock(&self) -> MutexGuard<'_, T>;
    }

    impl<T> PoisonlessLock<T> for Mutex<T> {
        fn plock(&self) -> MutexGuard<'_, T> {
            match self.lock() {
                Ok(l) => l,
                Err(e) => e.into_inner(),
            }
        }
    }
}
