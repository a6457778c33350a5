pub mod onnx_box_detector;
