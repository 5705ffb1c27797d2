//! 编辑上下文
//!
//! 一次编辑需要的全部协作者，按引用传给提供器和汇总器。

use crate::drawing::Drawing;
use crate::localization::Localizer;
use crate::report::ErrorReporter;
use crate::settings::UserSettings;
use crate::style_store::StyleStore;

pub struct EditContext<'a> {
    pub drawing: &'a mut Drawing,
    pub styles: &'a StyleStore,
    pub settings: &'a UserSettings,
    pub localizer: &'a dyn Localizer,
    pub reporter: &'a mut dyn ErrorReporter,
}

impl<'a> EditContext<'a> {
    pub fn new(
        drawing: &'a mut Drawing,
        styles: &'a StyleStore,
        settings: &'a UserSettings,
        localizer: &'a dyn Localizer,
        reporter: &'a mut dyn ErrorReporter,
    ) -> Self {
        Self {
            drawing,
            styles,
            settings,
            localizer,
            reporter,
        }
    }
}
