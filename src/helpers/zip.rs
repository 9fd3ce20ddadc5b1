use crate::error::ExcelSchemaError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Looks up an entry ignoring ASCII case and path separator style.
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, ExcelSchemaError>;

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, ExcelSchemaError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, ExcelSchemaError> {
        let pattern = name.replace('\\', "/");
        let Some(path) = self
            .file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(file_name))
            .map(str::to_owned)
        else {
            return Ok(None);
        };
        match self.by_name(&path) {
            Ok(file) => Ok(Some(file)),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, ExcelSchemaError> {
        Ok(self.file(name)?.map(|file| XmlReader::new(BufReader::new(file))))
    }
}
