//! User facing texts

use serde::{Deserialize, Serialize};

use crate::utils::{format_bytes, format_duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "ar")]
    Arabic,
    #[serde(rename = "en")]
    English,
}

/// Every message the bot sends, in one language
#[derive(Debug, Clone, Copy)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    fn pick(&self, ar: &'static str, en: &'static str) -> &'static str {
        match self.locale {
            Locale::Arabic => ar,
            Locale::English => en,
        }
    }

    pub fn welcome(&self) -> String {
        self.pick(
            "أهلاً بك في بوت NAQRA 🤖\n\nأرسل لي أي رابط من منصات التواصل الاجتماعي وسأقوم بتحليله لك.",
            "Welcome to NAQRA 🤖\n\nSend me any social media link and I will analyse it for you.",
        )
        .to_string()
    }

    pub fn join_prompt(&self, channel: &str, join_url: Option<&str>) -> String {
        let base = match self.locale {
            Locale::Arabic => format!("⚠️ يجب الاشتراك في القناة {} لاستخدام البوت.", channel),
            Locale::English => format!("⚠️ Please join {} to use this bot.", channel),
        };
        match join_url {
            Some(url) => format!("{}\n{}", base, url),
            None => base,
        }
    }

    pub fn analysing(&self) -> String {
        self.pick("جاري تحليل الرابط... ⏳", "Analysing the link... ⏳").to_string()
    }

    pub fn not_a_link(&self) -> String {
        self.pick("الرجاء إرسال رابط صالح.", "Please send a valid link.").to_string()
    }

    pub fn resolve_failed(&self) -> String {
        self.pick(
            "فشل تحليل الرابط. قد يكون خاصًا أو غير مدعوم.",
            "Could not analyse the link. It may be private or unsupported.",
        )
        .to_string()
    }

    pub fn untitled(&self) -> &'static str {
        self.pick("بدون عنوان", "Untitled")
    }

    /// Placeholder for a size or duration that is not known
    pub fn unknown(&self) -> &'static str {
        self.pick("غير معروف", "unknown")
    }

    /// Readable byte count, or the placeholder in this language
    pub fn size(&self, size: Option<u64>) -> String {
        match size {
            Some(_) => format_bytes(size),
            None => self.unknown().to_string(),
        }
    }

    /// Readable duration in seconds, or the placeholder in this language
    pub fn duration(&self, seconds: Option<f64>) -> String {
        match seconds {
            Some(seconds) => format_duration(Some(&seconds.to_string())),
            None => self.unknown().to_string(),
        }
    }

    pub fn caption(&self, title: &str, duration: &str) -> String {
        match self.locale {
            Locale::Arabic => format!("🎬 العنوان: {}\n⏳ المدة: {}", title, duration),
            Locale::English => format!("🎬 Title: {}\n⏳ Duration: {}", title, duration),
        }
    }

    pub fn video_label(&self, height: u32, size: &str) -> String {
        match self.locale {
            Locale::Arabic => format!("فيديو 🎥 {}p ({})", height, size),
            Locale::English => format!("Video 🎥 {}p ({})", height, size),
        }
    }

    pub fn audio_label(&self) -> String {
        self.pick("صوت 🎵 (MP3)", "Audio 🎵 (MP3)").to_string()
    }

    pub fn trim_label(&self) -> String {
        self.pick("قص المقطع ✂️", "Trim clip ✂️").to_string()
    }

    pub fn playlist_label(&self, limit: usize) -> String {
        match self.locale {
            Locale::Arabic => format!("تنزيل أول {} من القائمة 📂", limit),
            Locale::English => format!("Download first {} of the playlist 📂", limit),
        }
    }

    pub fn trim_prompt(&self) -> String {
        self.pick(
            "✂️ قص المقطع\n\nأرسل الآن وقت البداية والنهاية بالصيغة التالية:\nMM:SS-MM:SS\n\nمثال: 0:30-1:45",
            "✂️ Trim clip\n\nSend the start and end time as:\nMM:SS-MM:SS\n\nExample: 0:30-1:45",
        )
        .to_string()
    }

    pub fn choice_accepted(&self) -> String {
        self.pick(
            "تم اختيار الصيغة. جاري التنزيل والمعالجة...",
            "Format selected. Downloading and processing...",
        )
        .to_string()
    }

    pub fn stale_choice(&self) -> String {
        self.pick(
            "هذا الخيار لم يعد متاحًا، اختر من القائمة الحالية.",
            "That option is no longer available, pick one from the current menu.",
        )
        .to_string()
    }

    pub fn trim_received(&self, range: &str) -> String {
        match self.locale {
            Locale::Arabic => format!("تم استلام وقت القص ({}). جاري التنزيل والمعالجة...", range),
            Locale::English => format!(
                "Trim range received ({}). Downloading and processing...",
                range
            ),
        }
    }

    pub fn trim_invalid(&self) -> String {
        self.pick(
            "⚠️ صيغة الوقت غير صحيحة، سيتم تنزيل المقطع كاملاً.",
            "⚠️ Invalid time range, the full clip will be downloaded.",
        )
        .to_string()
    }

    pub fn download_started(&self) -> String {
        self.pick("بدء عملية التنزيل من المصدر...", "Starting download from the source...")
            .to_string()
    }

    pub fn upload_started(&self) -> String {
        self.pick("اكتمل التنزيل. جاري الرفع إليك...", "Download complete. Uploading...")
            .to_string()
    }

    pub fn pipeline_failed(&self, category: &str) -> String {
        match self.locale {
            Locale::Arabic => format!("حدث خطأ أثناء المعالجة ({}). حاول مرة أخرى.", category),
            Locale::English => format!(
                "Something went wrong while processing ({}). Please try again.",
                category
            ),
        }
    }

    pub fn cancelled(&self) -> String {
        self.pick("تم إلغاء العملية الحالية.", "The current operation was cancelled.")
            .to_string()
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self::new(Locale::default())
    }
}
