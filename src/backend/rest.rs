use crate::{
    api::{
        client::{JobClient, EVALUATION_DATASET},
        error::ApiError,
        job::{JobHandle, JobKind, JobState, JobStatusResponse},
        pipeline::{DspType, PipelineBlocks, PipelineDescriptor, PipelineSpec, ResizePolicy, KERAS_TRANSFER_IMAGE},
        training::{ModelVariant, TrainingParameters},
    },
    config::Settings,
    BlockId, JobId,
};
use anyhow::{anyhow, Context, Error};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Blocking client for the Studio REST API of one project.
pub struct Studio {
    project_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct SuccessFlag {
    #[serde(default)]
    success: bool,
}

fn reports_success(body: &str) -> bool {
    serde_json::from_str::<SuccessFlag>(body)
        .map(|flag| flag.success)
        .unwrap_or(false)
}

/// Non-200 is a `Status` error; a 200 lacking `success: true` is `Rejected`
/// for endpoints that check it.
fn classify<Ep: Endpoint>(status: u16, body: String) -> Result<String, ApiError> {
    if status != 200 {
        warn!(status, %body, "{} failed", Ep::NAME);
        return Err(ApiError::Status { status, body });
    }
    if Ep::CHECKS_SUCCESS && !reports_success(&body) {
        warn!(status, %body, "{} was rejected", Ep::NAME);
        return Err(ApiError::Rejected { body });
    }
    debug!(%body, "{} succeeded", Ep::NAME);
    Ok(body)
}

impl Studio {
    pub fn new(settings: &Settings) -> Self {
        Studio {
            project_url: format!("{}/{}", settings.api_url.trim_end_matches('/'), settings.project_id),
            api_key: settings.api_key.clone(),
        }
    }

    /// Sends `request` and returns the body of a successful response.
    fn send<Ep>(&self, request: &Ep) -> Result<String, ApiError>
    where
        Ep: Endpoint + EndpointExt,
    {
        let url = format!("{}/{}", self.project_url, request.path());
        debug!(%url, "{}", Ep::NAME);
        let mut http_request = Ep::METHOD(&url);
        http_request
            .set("x-api-key", &self.api_key)
            .set("Content-Type", "application/json");
        let http_response = if Ep::HAS_BODY {
            let buffer = Ep::write_request_string(request).context("serializing request failed")?;
            http_request.send_string(&buffer)
        } else {
            http_request.call()
        };

        if http_response.synthetic() {
            let reason = http_response
                .into_string()
                .unwrap_or_else(|_| "Could not turn error body into String.".to_string());
            return Err(ApiError::Transport(anyhow!("{} could not be sent: {}", Ep::NAME, reason)));
        }

        let status = http_response.status();
        let body = http_response.into_string().context("failed to turn response into string")?;
        classify::<Ep>(status, body)
    }

    fn execute<Ep, Val>(&self, request: &Ep) -> Result<Val, ApiError>
    where
        Ep: Endpoint<Value = Val> + EndpointExt,
    {
        let response_string = self.send(request)?;
        let response = Ep::read_response_string(&response_string)
            .with_context(|| format!("deserializing response failed:\n{}", &response_string))?;
        Ep::extract(response)
    }
}

impl JobClient for Studio {
    fn new_block_id(&mut self) -> Result<BlockId, ApiError> {
        self.execute(&NewBlockId)
    }

    fn create_pipeline(&mut self, spec: &PipelineSpec) -> Result<PipelineDescriptor, ApiError> {
        let descriptor = PipelineDescriptor {
            input_block_id: self.new_block_id()?,
            dsp_block_id: self.new_block_id()?,
            learn_block_id: self.new_block_id()?,
            dsp_type: spec.dsp_type,
            resize_policy: spec.resize_policy,
        };
        self.execute(&CreateImpulse::new(spec, &descriptor))?;
        info!(name = %spec.name, model = %spec.model, "pipeline created");
        Ok(descriptor)
    }

    fn get_pipeline(&mut self) -> Result<PipelineBlocks, ApiError> {
        self.execute(&GetImpulse)
    }

    fn delete_pipeline(&mut self) -> Result<(), ApiError> {
        self.execute(&DeleteImpulse)?;
        info!("pipeline deleted");
        Ok(())
    }

    fn generate_features(&mut self, dsp_block: BlockId) -> Result<JobHandle, ApiError> {
        let request = GenerateFeatures {
            dsp_id: dsp_block,
            calculate_feature_importance: true,
            skip_feature_explorer: false,
        };
        let id = self.execute(&request)?;
        info!(job = %id, "feature generation started");
        Ok(JobHandle::new(id, JobKind::FeatureGeneration))
    }

    fn start_training(
        &mut self,
        learn_block: BlockId,
        model: ModelVariant,
        parameters: &TrainingParameters,
    ) -> Result<JobHandle, ApiError> {
        let id = if model.is_organization_block() {
            self.execute(&TrainOrganization::new(learn_block, parameters))?
        } else {
            self.execute(&TrainKeras::new(learn_block, model, parameters))?
        };
        info!(job = %id, %model, "training started");
        Ok(JobHandle::new(id, JobKind::Training))
    }

    fn start_evaluation(&mut self) -> Result<JobHandle, ApiError> {
        let id = self.execute(&Classify { dataset: EVALUATION_DATASET })?;
        info!(job = %id, "evaluation started");
        Ok(JobHandle::new(id, JobKind::Evaluation))
    }

    fn job_status(&mut self, job: JobId) -> Result<JobState, ApiError> {
        self.execute(&GetJobStatus { job })
    }

    fn classify_results(&mut self) -> Result<String, ApiError> {
        self.send(&ClassifyResult)
    }

    fn delete_all_data(&mut self) -> Result<(), ApiError> {
        self.execute(&DeleteAllData)?;
        info!("all project data deleted");
        Ok(())
    }
}

trait Endpoint {
    const NAME: &'static str;
    const METHOD: fn(&str) -> ureq::Request;
    /// Whether a 200 must also carry `"success": true`.
    const CHECKS_SUCCESS: bool = false;
    const HAS_BODY: bool = true;

    type Response;
    type Value;

    fn path(&self) -> String;
    fn extract(response: Self::Response) -> Result<Self::Value, ApiError>;
}
trait VoidEndpoint {
    const NAME: &'static str;
    const METHOD: fn(&str) -> ureq::Request;
    const CHECKS_SUCCESS: bool = false;
    const HAS_BODY: bool = false;

    fn path(&self) -> String;
}
trait EndpointExt: Endpoint {
    fn read_response_string(response: &str) -> Result<Self::Response, Error>;
    fn write_request_string(request: &Self) -> Result<String, Error>;
}
impl<E> Endpoint for E
where
    E: VoidEndpoint,
{
    const NAME: &'static str = <E as VoidEndpoint>::NAME;
    const METHOD: fn(&str) -> ureq::Request = <E as VoidEndpoint>::METHOD;
    const CHECKS_SUCCESS: bool = <E as VoidEndpoint>::CHECKS_SUCCESS;
    const HAS_BODY: bool = <E as VoidEndpoint>::HAS_BODY;

    type Response = VoidResponse;
    type Value = ();

    fn path(&self) -> String {
        <E as VoidEndpoint>::path(self)
    }

    fn extract(_response: Self::Response) -> Result<Self::Value, ApiError> {
        Ok(())
    }
}
impl<P, R, V> EndpointExt for P
where
    P: Serialize,
    R: DeserializeOwned,
    P: Endpoint<Response = R, Value = V>,
{
    fn read_response_string(response: &str) -> Result<Self::Response, Error> {
        let response = serde_json::from_str::<'_, R>(response)?;
        Ok(response)
    }

    fn write_request_string(request: &Self) -> Result<String, Error> {
        Ok(serde_json::to_string(request)?)
    }
}

#[derive(Deserialize)]
struct VoidResponse {}

#[derive(Deserialize)]
struct StartJobResponse {
    #[serde(default)]
    id: Option<JobId>,
}

fn started_job(response: StartJobResponse) -> Result<JobId, ApiError> {
    response.id.ok_or(ApiError::Missing("id"))
}

#[derive(Debug, Clone, Copy, Serialize)]
struct NewBlockId;
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewBlockIdResponse {
    #[serde(default)]
    block_id: Option<BlockId>,
}
impl Endpoint for NewBlockId {
    const NAME: &'static str = "new block id";
    const METHOD: fn(&str) -> ureq::Request = ureq::post;
    const CHECKS_SUCCESS: bool = true;
    const HAS_BODY: bool = false;
    type Response = NewBlockIdResponse;
    type Value = BlockId;

    fn path(&self) -> String {
        "impulse/get-new-block-id".to_string()
    }

    fn extract(response: Self::Response) -> Result<Self::Value, ApiError> {
        response.block_id.ok_or(ApiError::Missing("blockId"))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateImpulse<'a> {
    pub name: &'a str,
    pub input_blocks: [InputBlock; 1],
    pub dsp_blocks: [DspBlock; 1],
    pub learn_blocks: [LearnBlock; 1],
}
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct InputBlock {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: &'static str,
    pub title: &'static str,
    pub image_width: u32,
    pub image_height: u32,
    pub resize_mode: ResizePolicy,
    pub resize_method: ResizePolicy,
}
#[derive(Debug, Clone, Serialize)]
struct DspBlock {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub kind: DspType,
    pub name: &'static str,
    pub axes: [&'static str; 1],
    pub input: BlockId,
    pub title: &'static str,
}
#[derive(Debug, Clone, Serialize)]
struct LearnBlock {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Not read by the platform, but kept in the stored pipeline for reference.
    pub model: ModelVariant,
    pub name: &'static str,
    pub dsp: [BlockId; 1],
    pub title: &'static str,
}
impl<'a> CreateImpulse<'a> {
    fn new(spec: &'a PipelineSpec, ids: &PipelineDescriptor) -> Self {
        let pixels = spec.image_size.pixels();
        CreateImpulse {
            name: &spec.name,
            input_blocks: [InputBlock {
                id: ids.input_block_id,
                kind: "image",
                name: "image-input",
                title: "Image data",
                image_width: pixels,
                image_height: pixels,
                resize_mode: spec.resize_policy,
                resize_method: spec.resize_policy,
            }],
            dsp_blocks: [DspBlock {
                id: ids.dsp_block_id,
                kind: spec.dsp_type,
                name: "image-features",
                axes: ["image"],
                input: ids.input_block_id,
                title: "Image",
            }],
            learn_blocks: [LearnBlock {
                id: ids.learn_block_id,
                kind: KERAS_TRANSFER_IMAGE,
                model: spec.model,
                name: "transfer-learning",
                dsp: [ids.dsp_block_id],
                title: "Transfer Learning (Images)",
            }],
        }
    }
}
impl Endpoint for CreateImpulse<'_> {
    const NAME: &'static str = "create pipeline";
    const METHOD: fn(&str) -> ureq::Request = ureq::post;
    const CHECKS_SUCCESS: bool = true;
    type Response = VoidResponse;
    type Value = ();

    fn path(&self) -> String {
        "impulse".to_string()
    }

    fn extract(_response: Self::Response) -> Result<Self::Value, ApiError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GetImpulse;
#[derive(Deserialize)]
struct GetImpulseResponse {
    #[serde(default)]
    impulse: Option<PipelineBlocks>,
}
impl Endpoint for GetImpulse {
    const NAME: &'static str = "get pipeline";
    const METHOD: fn(&str) -> ureq::Request = ureq::get;
    const HAS_BODY: bool = false;
    type Response = GetImpulseResponse;
    type Value = PipelineBlocks;

    fn path(&self) -> String {
        "impulse".to_string()
    }

    fn extract(response: Self::Response) -> Result<Self::Value, ApiError> {
        response.impulse.ok_or(ApiError::Missing("impulse"))
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct DeleteImpulse;
impl VoidEndpoint for DeleteImpulse {
    const NAME: &'static str = "delete pipeline";
    const METHOD: fn(&str) -> ureq::Request = ureq::delete;

    fn path(&self) -> String {
        "impulse".to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateFeatures {
    pub dsp_id: BlockId,
    pub calculate_feature_importance: bool,
    pub skip_feature_explorer: bool,
}
impl Endpoint for GenerateFeatures {
    const NAME: &'static str = "generate features";
    const METHOD: fn(&str) -> ureq::Request = ureq::post;
    const CHECKS_SUCCESS: bool = true;
    type Response = StartJobResponse;
    type Value = JobId;

    fn path(&self) -> String {
        "jobs/generate-features".to_string()
    }

    fn extract(response: Self::Response) -> Result<Self::Value, ApiError> {
        started_job(response)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrainKeras {
    #[serde(skip)]
    pub learn_block: BlockId,
    pub mode: &'static str,
    pub training_cycles: u32,
    pub learning_rate: f64,
    pub batch_size: u32,
    pub train_test_split: f64,
    pub auto_class_weights: bool,
    pub visual_layers: [VisualLayer; 1],
    pub profile_int8: bool,
}
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct VisualLayer {
    #[serde(rename = "type")]
    pub kind: ModelVariant,
    pub neurons: u32,
    pub dropout_rate: f64,
}
impl TrainKeras {
    fn new(learn_block: BlockId, model: ModelVariant, parameters: &TrainingParameters) -> Self {
        TrainKeras {
            learn_block,
            mode: "visual",
            training_cycles: parameters.training_cycles,
            learning_rate: parameters.learning_rate,
            batch_size: parameters.batch_size,
            train_test_split: parameters.train_test_split,
            auto_class_weights: parameters.auto_class_weights,
            visual_layers: [VisualLayer {
                kind: model,
                neurons: parameters.neurons,
                dropout_rate: parameters.dropout_rate,
            }],
            profile_int8: parameters.profile_int8,
        }
    }
}
impl Endpoint for TrainKeras {
    const NAME: &'static str = "start training";
    const METHOD: fn(&str) -> ureq::Request = ureq::post;
    type Response = StartJobResponse;
    type Value = JobId;

    fn path(&self) -> String {
        format!("jobs/train/keras/{}", self.learn_block)
    }

    fn extract(response: Self::Response) -> Result<Self::Value, ApiError> {
        started_job(response)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrainOrganization<'a> {
    #[serde(skip)]
    pub learn_block: BlockId,
    pub train_test_split: f64,
    pub custom_validation_metadata_key: &'static str,
    pub auto_class_weights: bool,
    pub profile_int8: bool,
    pub learning_rate: f64,
    pub training_cycles: u32,
    pub visual_layers: [OrganizationLayer; 1],
    pub augmentation_policy_image: &'static str,
    pub use_learned_optimizer: bool,
    pub block_parameters: BTreeMap<String, String>,
    pub custom_parameters: &'a BTreeMap<String, String>,
}
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationLayer {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub organization_model_id: u64,
}
impl<'a> TrainOrganization<'a> {
    fn new(learn_block: BlockId, parameters: &'a TrainingParameters) -> Self {
        TrainOrganization {
            learn_block,
            train_test_split: parameters.train_test_split,
            custom_validation_metadata_key: "",
            auto_class_weights: parameters.auto_class_weights,
            profile_int8: parameters.profile_int8,
            learning_rate: parameters.learning_rate,
            training_cycles: parameters.training_cycles,
            visual_layers: [OrganizationLayer {
                kind: "transfer_organization",
                organization_model_id: parameters.organization.organization_model_id,
            }],
            augmentation_policy_image: "none",
            use_learned_optimizer: false,
            block_parameters: BTreeMap::new(),
            custom_parameters: &parameters.organization.custom_parameters,
        }
    }
}
impl Endpoint for TrainOrganization<'_> {
    const NAME: &'static str = "start training";
    const METHOD: fn(&str) -> ureq::Request = ureq::post;
    type Response = StartJobResponse;
    type Value = JobId;

    fn path(&self) -> String {
        format!("jobs/train/keras/{}", self.learn_block)
    }

    fn extract(response: Self::Response) -> Result<Self::Value, ApiError> {
        started_job(response)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct Classify {
    pub dataset: &'static str,
}
impl Endpoint for Classify {
    const NAME: &'static str = "start evaluation";
    const METHOD: fn(&str) -> ureq::Request = ureq::post;
    type Response = StartJobResponse;
    type Value = JobId;

    fn path(&self) -> String {
        "jobs/classify".to_string()
    }

    fn extract(response: Self::Response) -> Result<Self::Value, ApiError> {
        started_job(response)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GetJobStatus {
    #[serde(skip)]
    pub job: JobId,
}
impl Endpoint for GetJobStatus {
    const NAME: &'static str = "job status";
    const METHOD: fn(&str) -> ureq::Request = ureq::get;
    const HAS_BODY: bool = false;
    type Response = JobStatusResponse;
    type Value = JobState;

    fn path(&self) -> String {
        format!("jobs/{}/status", self.job)
    }

    fn extract(response: Self::Response) -> Result<Self::Value, ApiError> {
        Ok(response.into())
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct ClassifyResult;
impl VoidEndpoint for ClassifyResult {
    const NAME: &'static str = "fetch results";
    const METHOD: fn(&str) -> ureq::Request = ureq::get;

    fn path(&self) -> String {
        "classify/all/result".to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct DeleteAllData;
impl VoidEndpoint for DeleteAllData {
    const NAME: &'static str = "delete all data";
    const METHOD: fn(&str) -> ureq::Request = ureq::post;

    fn path(&self) -> String {
        "raw-data/delete-all".to_string()
    }
}
