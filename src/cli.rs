use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::client::DEFAULT_SERVER_URL;
use crate::preprocess::TensorLayout;
use crate::report::{PatientRecord, REPORT_FILE_NAME};
use crate::server::DEFAULT_MAX_UPLOAD_BYTES;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Serve the tumor classifier over HTTP
    Serve(ServeArgs),
    /// Send one MRI scan to the server and write a PDF report
    Analyze(AnalyzeArgs),
    /// Interactive assistant: questions, `/analyze <path>`, `/clear`, `/quit`
    Chat(ChatArgs),
}

#[derive(ClapArgs, Clone, Debug)]
pub struct ServeArgs {
    /// ONNX model path
    #[arg(long, env = "MRI_MODEL", required = true)]
    pub model: String,

    /// Labels file, one class per line in model output order
    #[arg(long, env = "MRI_LABELS")]
    pub labels: Option<String>,

    #[arg(long, env = "MRI_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "MRI_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Square model input resolution
    #[arg(long, env = "MRI_INPUT_SIZE", default_value_t = 224,
          value_parser = clap::value_parser!(u32).range(1..=4096))]
    pub input_size: u32,

    #[arg(long, env = "MRI_LAYOUT", value_enum, default_value_t = TensorLayout::Nhwc)]
    pub layout: TensorLayout,

    /// Treat model outputs as logits
    #[arg(long)]
    pub softmax: bool,

    /// Run inference with the CUDA execution provider
    #[arg(long)]
    pub cuda: bool,

    #[arg(long, env = "MRI_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

#[derive(ClapArgs, Clone, Debug)]
pub struct ClientArgs {
    /// Base URL of the prediction server
    #[arg(long, env = "MRI_SERVER", default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

#[derive(ClapArgs, Clone, Debug, Default)]
pub struct PatientArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub age: Option<String>,

    #[arg(long)]
    pub gender: Option<String>,
}

impl PatientArgs {
    pub fn record(&self) -> PatientRecord {
        PatientRecord {
            name: self.name.clone(),
            age: self.age.clone(),
            gender: self.gender.clone(),
        }
    }
}

#[derive(ClapArgs, Clone, Debug)]
pub struct AnalyzeArgs {
    /// image path
    #[arg(long, required = true)]
    pub source: String,

    /// Where to write the PDF report
    #[arg(long, default_value = REPORT_FILE_NAME)]
    pub output: String,

    #[command(flatten)]
    pub client: ClientArgs,

    #[command(flatten)]
    pub patient: PatientArgs,
}

#[derive(ClapArgs, Clone, Debug)]
pub struct ChatArgs {
    /// Directory for reports written by `/analyze`
    #[arg(long, default_value = ".")]
    pub report_dir: String,

    #[command(flatten)]
    pub client: ClientArgs,

    #[command(flatten)]
    pub patient: PatientArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn serve_defaults() {
        let args = Args::try_parse_from(["mri-assist", "serve", "--model", "m.onnx"]).unwrap();
        let Command::Serve(serve) = args.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.port, 5000);
        assert_eq!(serve.input_size, 224);
        assert_eq!(serve.layout, TensorLayout::Nhwc);
        assert!(!serve.softmax);
    }

    #[test]
    fn analyze_collects_patient_fields() {
        let args = Args::try_parse_from([
            "mri-assist", "analyze", "--source", "scan.jpg", "--name", "Jane", "--age", "41",
        ])
        .unwrap();
        let Command::Analyze(analyze) = args.command else {
            panic!("expected analyze");
        };
        assert_eq!(analyze.output, REPORT_FILE_NAME);
        let record = analyze.patient.record();
        assert_eq!(record.name(), "Jane");
        assert_eq!(record.gender(), "Not Provided");
    }

    #[test]
    fn zero_input_size_is_rejected() {
        assert!(
            Args::try_parse_from(["mri-assist", "serve", "--model", "m.onnx", "--input-size", "0"])
                .is_err()
        );
    }
}
